pub(crate) mod answers;
pub(crate) mod clock;
pub(crate) mod controller;
pub(crate) mod error;
pub(crate) mod guard;
pub(crate) mod registry;
