//! The closed operation table. Each operation kind pins one request AAD tag
//! and one result AAD tag; routing goes through this table only, never by
//! trying tags against a ciphertext until one fits.

use crate::aad;
use crate::payload::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Evaluate,
    Sign,
}

impl OpKind {
    /// Resolves the operation from a request record's framing tag.
    /// Result tags and unknown strings resolve to nothing.
    pub fn for_request_tag(tag: &str) -> Option<Self> {
        match tag {
            aad::EVALUATE => Some(OpKind::Evaluate),
            aad::SIGN => Some(OpKind::Sign),
            _ => None,
        }
    }

    pub const fn aad_in(self) -> &'static str {
        match self {
            OpKind::Evaluate => aad::EVALUATE,
            OpKind::Sign => aad::SIGN,
        }
    }

    pub const fn aad_out(self) -> &'static str {
        match self {
            OpKind::Evaluate => aad::EVALUATE_RESULT,
            OpKind::Sign => aad::SIGN_RESULT,
        }
    }

    /// Whether a decrypted body's own tag agrees with the routed kind.
    pub fn matches_request(self, request: &Request) -> bool {
        matches!(
            (self, request),
            (OpKind::Evaluate, Request::Evaluate { .. }) | (OpKind::Sign, Request::Sign { .. })
        )
    }
}
