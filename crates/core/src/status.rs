//! Status enums stored as lowercase `TEXT` columns.
//!
//! Each variant's wire name matches the `CHECK` constraint on the
//! corresponding column in the migrations.

use crate::error::CoreError;

macro_rules! define_text_status {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Return the database string value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $val => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        concat!("Unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

define_text_status! {
    /// Lifecycle of a customer's place in the queue.
    QueueStatus {
        Queued = "queued",
        DepositRequired = "deposit_required",
        Active = "active",
        Booked = "booked",
        Paused = "paused",
        Expired = "expired",
        Canceled = "canceled",
    }
}

define_text_status! {
    /// Deposit lifecycle for a queue entry.
    DepositStatus {
        None = "none",
        Required = "required",
        Paid = "paid",
        Expired = "expired",
        Refunded = "refunded",
    }
}

define_text_status! {
    /// Outcome recorded on a `booking_attempts` row.
    BookingResult {
        Success = "success",
        Fail = "fail",
        Skipped = "skipped",
    }
}

define_text_status! {
    /// Kind of customer message written to the message log.
    MessageKind {
        DepositNeeded = "deposit_needed",
        DepositReceived = "deposit_received",
        Booked = "booked",
        OpportunityPassed = "opportunity_passed",
        Status = "status",
    }
}

impl QueueStatus {
    /// Statuses that hold a rank in the queue.
    pub const RANKED: [QueueStatus; 3] = [
        QueueStatus::Queued,
        QueueStatus::DepositRequired,
        QueueStatus::Active,
    ];

    /// Whether an entry in this status occupies a rank this cycle.
    pub fn is_ranked(self) -> bool {
        Self::RANKED.contains(&self)
    }
}
