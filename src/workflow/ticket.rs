//! Support ticket conversation state

text_enum! {
    pub enum TicketStatus {
        Open => "open",
        Answered => "answered",
        Closed => "closed",
    }
}

impl TicketStatus {
    /// Status after a new message, or `None` when the ticket does not accept messages
    pub fn after_reply(&self, from_staff: bool) -> Option<TicketStatus> {
        match self {
            TicketStatus::Closed => None,
            _ if from_staff => Some(TicketStatus::Answered),
            _ => Some(TicketStatus::Open),
        }
    }

    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Open, Answered) | (Answered, Open) | (Open, Closed) | (Answered, Closed) | (Closed, Open)
        )
    }
}

text_enum! {
    pub enum TicketCategory {
        General => "general",
        Application => "application",
        Documents => "documents",
        Stipend => "stipend",
        Technical => "technical",
    }
}
