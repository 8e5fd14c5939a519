use futures::future::{BoxFuture, FutureExt};
use tracing::trace;

use crate::application::error::PlainTextError;
use crate::domain::entities::NodeRef;

use super::PlainTextSession;

impl PlainTextSession {
    /// Derived text of `node`, regenerating it first when flagged.
    ///
    /// With `use_cache`, a value memoized earlier in this session is returned
    /// as-is, including a memoized `None`. Non-participating nodes yield `None`
    /// and are never memoized.
    pub fn get_derived_text<'a>(
        &'a self,
        node: &'a NodeRef,
        use_cache: bool,
    ) -> BoxFuture<'a, Result<Option<String>, PlainTextError>> {
        async move {
            if !self.is_enabled(node) {
                return Ok(None);
            }

            let key = self.memo_key(node);
            if use_cache && let Some(text) = self.memo.get(&key) {
                trace!(node = %node, "derived text served from memo");
                return Ok(text);
            }

            let state = self.service.store.load_state(node, self.stage).await?;
            let mut text = if state.reset_flag {
                self.regenerate(node, false).await?;
                self.service
                    .store
                    .load_state(node, self.stage)
                    .await?
                    .derived_text
            } else {
                state.derived_text
            };

            self.service.hooks.update_derived_text(node, &mut text);
            self.memo.insert(key, text.clone());
            Ok(text)
        }
        .boxed()
    }
}
