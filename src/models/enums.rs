use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Waiting => "waiting",
    Preparing => "preparing",
    Consulting => "consulting",
    Completed => "completed",
    Canceled => "canceled",
});

impl AppointmentStatus {
    /// Column order on the appointment board.
    pub const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Waiting,
        AppointmentStatus::Preparing,
        AppointmentStatus::Consulting,
        AppointmentStatus::Completed,
        AppointmentStatus::Canceled,
    ];
}

str_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
});

str_enum!(UserRole {
    Admin => "admin",
    Practitioner => "practitioner",
    Assistant => "assistant",
});

str_enum!(DocumentKind {
    Prescription => "prescription",
    LabResult => "lab_result",
    Imaging => "imaging",
    Referral => "referral",
    Other => "other",
});

str_enum!(Weekday {
    Mon => "mon",
    Tue => "tue",
    Wed => "wed",
    Thu => "thu",
    Fri => "fri",
    Sat => "sat",
    Sun => "sun",
});
