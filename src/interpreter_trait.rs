// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use canonical_error::CanonicalError;
use async_trait::async_trait;

use crate::config::{ObserverContext, SessionDefaults};
use crate::localize::FilterPredicate;
use crate::optics::Equipment;

/// What an interpreter extracted from one free-text planning request: the
/// observer context (any field the text did not determine stays None and is
/// later merged with session defaults), the imaging train, and a filter
/// over the localized field set. The predicate is opaque here; only its
/// `matches()` behavior reaches the query layer.
pub struct InterpretedRequest {
    pub context: ObserverContext,
    pub equipment: Equipment,
    pub predicate: Option<Box<dyn FilterPredicate>>,
}

// Turns free-text planning requests into structured ones. Implementations
// live outside this crate (typically a language-model call over the
// network), which is why the interface is async; the core only consumes
// the result.
// If InterpretedRequest is not returned, an error is returned:
//   InvalidArgument: the request text could not be interpreted.
//   DeadlineExceeded/Unavailable: the backing service failed.
#[async_trait]
pub trait RequestInterpreter {
    async fn interpret(&self, request_text: &str,
                       defaults: &SessionDefaults)
                       -> Result<InterpretedRequest, CanonicalError>;
}
