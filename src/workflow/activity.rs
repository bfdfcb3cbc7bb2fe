//! Program and opportunity participation, including the attendance and
//! excuse sub-flows.

text_enum! {
    pub enum ActivityApplicationStatus {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
        Cancelled => "cancelled",
        Attended => "attended",
        Absent => "absent",
        ExcuseRequested => "excuse_requested",
        Excused => "excused",
    }
}

impl ActivityApplicationStatus {
    pub fn is_terminal(&self) -> bool {
        use ActivityApplicationStatus::*;
        matches!(self, Rejected | Cancelled | Attended | Absent | Excused)
    }

    pub fn can_transition_to(&self, next: ActivityApplicationStatus) -> bool {
        use ActivityApplicationStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Accepted, Attended)
                | (Accepted, Absent)
                | (Accepted, ExcuseRequested)
                | (ExcuseRequested, Excused)
                | (ExcuseRequested, Absent)
        )
    }

    /// Counts against the activity's capacity
    pub fn holds_seat(&self) -> bool {
        use ActivityApplicationStatus::*;
        matches!(self, Accepted | Attended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ActivityApplicationStatus::*;

    #[test]
    fn test_attendance_only_after_acceptance() {
        assert!(Accepted.can_transition_to(Attended));
        assert!(!Pending.can_transition_to(Attended));
        assert!(!ExcuseRequested.can_transition_to(Attended));
    }

    #[test]
    fn test_excuse_flow() {
        assert!(Accepted.can_transition_to(ExcuseRequested));
        assert!(ExcuseRequested.can_transition_to(Excused));
        assert!(ExcuseRequested.can_transition_to(Absent));
        assert!(!Attended.can_transition_to(ExcuseRequested));
    }

    #[test]
    fn test_seat_accounting() {
        assert!(!Pending.holds_seat());
        assert!(Accepted.holds_seat());
        assert!(Attended.holds_seat());
        assert!(!Rejected.holds_seat());
        assert!(!Cancelled.holds_seat());
        assert!(!ExcuseRequested.holds_seat());
    }
}
