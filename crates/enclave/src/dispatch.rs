//! Handler dispatch for decrypted requests. The routing decision was made
//! from framing before decryption (see [`channel::ops::OpKind`]); this
//! module runs the matching handler and shapes its outcome into a sealed
//! response.

use std::time::Instant;

use zeroize::Zeroizing;

use channel::limits::MAX_CODE;
use channel::ops::OpKind;
use channel::payload::{Request, Response};

use crate::{Evaluator, Signer};

/// Runs `request` against the handler selected by `op`. `deadline` bounds
/// the call; the evaluator sees it as an interrupt predicate.
pub fn run<E: Evaluator, S: Signer>(
    op: OpKind,
    request: Request,
    evaluator: &E,
    signer: &S,
    deadline: Instant,
) -> Response {
    if !op.matches_request(&request) {
        return Response::handler_error("operation does not match request body");
    }
    match request {
        Request::Evaluate { source, bindings } => {
            if source.len() > MAX_CODE {
                return Response::handler_error("source exceeds size cap");
            }
            let interrupt = move || Instant::now() >= deadline;
            let outcome = evaluator.evaluate(&source, &bindings, &interrupt);
            if interrupt() {
                return Response::timeout();
            }
            match outcome {
                Ok(value) => Response::Ok(value),
                Err(failure) => Response::handler_error(failure.0),
            }
        }
        Request::Sign { tx, key } => {
            // The key bytes are wiped whether the signer succeeds or not.
            let key = Zeroizing::new(key);
            match signer.sign(&tx, &key) {
                Ok(signature) => match serde_json::to_value(signature) {
                    Ok(value) => Response::Ok(value),
                    Err(_) => Response::handler_error("unencodable signature"),
                },
                Err(failure) => Response::handler_error(failure.0),
            }
        }
    }
}
