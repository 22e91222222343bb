pub(crate) mod errors;
pub(crate) mod exams;
pub(crate) mod grading_scales;
pub(crate) mod handlers;
pub(crate) mod router;
pub(crate) mod sessions;
