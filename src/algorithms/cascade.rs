// Deleting a feature together with its related child rows.
//
// Children are handled one at a time, depth first, before the parent:
// `cascade` children are deleted and committed like any feature, `db`
// children are only dropped from the map since the backend removes them with
// their parent, and `none` leaves them orphaned. Under autosave each delete
// is sent before the next one is recorded. A failed child lookup or a failed
// child commit fails the whole delete before the parent is touched; the
// child's delete stays pending for the next save.

use std::rc::Rc;

use futures_util::future::{FutureExt, LocalBoxFuture};

use crate::config::DeleteMode;
use crate::error::EditorError;
use crate::geometry::limits::MAX_CASCADE_DEPTH;
use crate::ledger::EditKind;
use crate::model::Feature;
use crate::EditorSession;

pub(crate) fn delete_feature<'a>(
    session: &'a mut EditorSession,
    layer: &'a str,
    feature: Feature,
    suppress_persist: bool,
    depth: usize,
) -> LocalBoxFuture<'a, Result<(), EditorError>> {
    async move {
        if depth > MAX_CASCADE_DEPTH {
            return Err(EditorError::CascadeTooDeep(MAX_CASCADE_DEPTH));
        }
        let related = Rc::clone(&session.related);
        for rel in related.config(layer).unwrap_or_default() {
            if !matches!(rel.cascading_delete, DeleteMode::Cascade | DeleteMode::Db) {
                continue;
            }
            let children = related.child_features(layer, &feature, &rel.layer_name).await?;
            log::debug!("{layer}/{}: {} children in '{}' ({:?})", feature.id, children.len(), rel.layer_name, rel.cascading_delete);
            for child in children {
                delete_feature(&mut *session, &rel.layer_name, child, rel.cascading_delete == DeleteMode::Db, depth + 1).await?;
            }
        }
        if !suppress_persist {
            session.record_change(layer, &feature.id, EditKind::Delete, false);
        }
        session.layers.remove_feature(layer, &feature.id);
        session.forget_selected(&feature.id);
        session.settle_autosaves().await.into_result()
    }
    .boxed_local()
}
