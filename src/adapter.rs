//! Slint model synchronisation (`slint` feature).
//!
//! Keeps `VecModel`s bound in a `.slint` UI in step with engine output,
//! updating rows in place so Slint only re-evaluates what changed.
//!
//! ```ignore
//! let edges = Rc::new(VecModel::<EdgeData>::default());
//! let sync = EdgePathModelSync::new(edges.clone(), |render| EdgeData {
//!     id: render.id.as_str().into(),
//!     path: render.path.as_str().into(),
//!     selected: render.selected,
//! });
//! window.set_edges(ModelRc::from(edges));
//!
//! // After every frame:
//! sync.sync(&flow.edge_renders(true));
//! ```

use crate::edges::EdgeRender;
use crate::selection::SelectionManager;
use slint::{Model, ModelRc, SharedString, VecModel};
use std::rc::Rc;

/// Overwrites `model` row by row with `items`, trimming excess rows.
fn sync_rows<P: Clone + 'static>(model: &VecModel<P>, items: impl IntoIterator<Item = P>) {
    let mut len = 0;
    for (i, item) in items.into_iter().enumerate() {
        if i < model.row_count() {
            model.set_row_data(i, item);
        } else {
            model.push(item);
        }
        len = i + 1;
    }
    while model.row_count() > len {
        model.remove(model.row_count() - 1);
    }
}

/// Mirrors rendered edges into a Slint model of any row type.
pub struct EdgePathModelSync<P, F> {
    model: Rc<VecModel<P>>,
    constructor: F,
}

impl<P, F> EdgePathModelSync<P, F>
where
    P: Clone + 'static,
    F: Fn(&EdgeRender) -> P,
{
    /// # Arguments
    ///
    /// * `model` - The VecModel to sync to
    /// * `constructor` - Builds a row from one rendered edge
    pub fn new(model: Rc<VecModel<P>>, constructor: F) -> Self {
        Self { model, constructor }
    }

    pub fn model(&self) -> ModelRc<P> {
        ModelRc::from(self.model.clone())
    }

    /// Replaces the model contents with `renders`, in render order.
    pub fn sync(&self, renders: &[EdgeRender]) {
        sync_rows(&self.model, renders.iter().map(&self.constructor));
    }
}

/// Mirrors a selection into a model of ids, sorted for stable row order.
pub fn sync_selection_to_model(selection: &SelectionManager, model: &VecModel<SharedString>) {
    let mut ids: Vec<&str> = selection.iter().collect();
    ids.sort_unstable();
    sync_rows(model, ids.into_iter().map(SharedString::from));
}
