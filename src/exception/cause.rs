//! Cause chain walking.

use crate::failure::kind_of;
use crate::record::CauseNode;
use std::error::Error as StdError;

/// Deepest cause level reported before the chain is cut off.
pub const MAX_CAUSE_DEPTH: usize = 50;

/// Kind name of the node that terminates a cut-off chain.
pub const TRUNCATED_KIND: &str = "Truncated";

/// Converts a cause chain into nested [`CauseNode`]s, outermost first.
///
/// `cause` is the head of the chain (usually `Failure::cause`). Each level
/// keeps the cause's message and kind name; `None` in gives `None` out.
/// Chains longer than [`MAX_CAUSE_DEPTH`] end in a sentinel node.
pub fn walk(cause: Option<&(dyn StdError + 'static)>) -> Option<CauseNode> {
    let mut levels = Vec::new();
    let mut current = cause;

    while let Some(error) = current {
        if levels.len() == MAX_CAUSE_DEPTH {
            levels.push(CauseNode::new(
                format!("Cause chain truncated after {MAX_CAUSE_DEPTH} levels"),
                TRUNCATED_KIND,
            ));
            break;
        }
        levels.push(CauseNode::new(error.to_string(), kind_of(error)));
        current = error.source();
    }

    levels.into_iter().rev().fold(None, |inner, mut node| {
        node.inner_exception = inner.map(Box::new);
        Some(node)
    })
}
