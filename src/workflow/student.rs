//! Enrolled student lifecycle

text_enum! {
    pub enum StudentStatus {
        Active => "active",
        Suspended => "suspended",
        Graduated => "graduated",
        Withdrawn => "withdrawn",
    }
}

impl StudentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StudentStatus::Graduated | StudentStatus::Withdrawn)
    }

    pub fn can_transition_to(&self, next: StudentStatus) -> bool {
        use StudentStatus::*;
        matches!(
            (self, next),
            (Active, Suspended)
                | (Suspended, Active)
                | (Active, Graduated)
                | (Active, Withdrawn)
                | (Suspended, Graduated)
                | (Suspended, Withdrawn)
        )
    }

    /// Students in this state may apply to programs and opportunities
    pub fn may_participate(&self) -> bool {
        *self == StudentStatus::Active
    }
}
