//! QR attendance for programs and opportunities
//!
//! Staff display a short-lived signed token as a QR code; students scan it
//! and the check-in service validates it against their participation.

pub mod limiter;
pub mod qr;

pub use limiter::ScanLimiter;
pub use qr::{IssuedQrToken, QrClaims, QrTokenService};
