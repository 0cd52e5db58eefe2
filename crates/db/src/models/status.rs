//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data in the
//! corresponding `*_statuses` database table.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                $(
                    if id == $val {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Analysis job lifecycle status.
    JobStatus {
        Queued = 1,
        Running = 2,
        Completed = 3,
        Failed = 4,
    }
}

impl JobStatus {
    /// Return the status name as seeded in `job_statuses`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Statuses a job may be in when moving to `target`.
    ///
    /// `Running` is re-enterable from `Running` and `Failed` because a queue
    /// redelivery restarts the pipeline. `Completed` is terminal.
    pub fn sources_for(target: Self) -> &'static [Self] {
        match target {
            Self::Queued => &[],
            Self::Running => &[Self::Queued, Self::Running, Self::Failed],
            Self::Completed | Self::Failed => &[Self::Running],
        }
    }

    /// Whether a job in `self` may move to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        Self::sources_for(next).contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [JobStatus; 4] = [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    #[test]
    fn ids_round_trip() {
        for status in ALL {
            assert_eq!(JobStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(JobStatus::from_id(0), None);
        assert_eq!(JobStatus::from_id(5), None);
    }

    #[test]
    fn only_forward_transitions_allowed() {
        let allowed = [
            (JobStatus::Queued, JobStatus::Running),
            (JobStatus::Running, JobStatus::Running),
            (JobStatus::Failed, JobStatus::Running),
            (JobStatus::Running, JobStatus::Completed),
            (JobStatus::Running, JobStatus::Failed),
        ];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn nothing_returns_to_queued() {
        assert!(JobStatus::sources_for(JobStatus::Queued).is_empty());
    }

    #[test]
    fn completed_is_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(!JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }
}
