use std::borrow::Cow;

use crate::model::TreeModel;

/// Supplies the text and icon of each node.
pub trait TreeLabelProvider<T: TreeModel> {
    /// Label drawn next to the icon.
    fn text<'a>(&'a self, model: &'a T, id: T::Id) -> Cow<'a, str>;

    /// Key used to fetch the node's icon from the image providers.
    fn icon_key<'a>(&'a self, model: &'a T, id: T::Id) -> Option<Cow<'a, str>> {
        let _ = (model, id);
        None
    }
}

impl<T, F> TreeLabelProvider<T> for F
where
    T: TreeModel,
    F: Fn(&T, T::Id) -> String,
{
    #[inline]
    fn text<'a>(&'a self, model: &'a T, id: T::Id) -> Cow<'a, str> {
        Cow::Owned(self(model, id))
    }
}

/// Labels every node with its `Debug` representation, which doubles as the
/// icon key.
#[derive(Clone, Copy, Debug, Default)]
pub struct DebugLabels;

impl<T: TreeModel> TreeLabelProvider<T> for DebugLabels {
    fn text<'a>(&'a self, _model: &'a T, id: T::Id) -> Cow<'a, str> {
        Cow::Owned(format!("{id:?}"))
    }

    fn icon_key<'a>(&'a self, _model: &'a T, id: T::Id) -> Option<Cow<'a, str>> {
        Some(Cow::Owned(format!("{id:?}")))
    }
}
