//! Student service requests

text_enum! {
    pub enum RequestStatus {
        Pending => "pending",
        InReview => "in_review",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Rejected | RequestStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, InReview)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (InReview, Approved)
                | (InReview, Rejected)
        )
    }

    /// Transitions the request owner may perform themselves
    pub fn owner_may_set(&self) -> bool {
        *self == RequestStatus::Cancelled
    }
}

text_enum! {
    pub enum RequestKind {
        EnrollmentLetter => "enrollment_letter",
        StipendIssue => "stipend_issue",
        LeaveOfAbsence => "leave_of_absence",
        TransferUniversity => "transfer_university",
        ChangeSpecialization => "change_specialization",
        Other => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_path() {
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::InReview));
        assert!(RequestStatus::InReview.can_transition_to(RequestStatus::Approved));
        assert!(!RequestStatus::Pending.can_transition_to(RequestStatus::Approved));
        assert!(!RequestStatus::InReview.can_transition_to(RequestStatus::Cancelled));
    }

    #[test]
    fn test_owner_can_only_cancel() {
        assert!(RequestStatus::Cancelled.owner_may_set());
        assert!(!RequestStatus::Approved.owner_may_set());
    }
}
