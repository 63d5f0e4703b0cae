pub(crate) mod edit;
pub(crate) mod model;
pub(crate) mod store;
