pub(crate) mod exam_backend;
pub(crate) mod exam_catalog;
pub(crate) mod grade_bands;
pub(crate) mod placeholder_exam;
