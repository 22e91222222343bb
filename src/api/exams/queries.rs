use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(super) struct AvailableExamsQuery {
    /// Comma-separated exam ids already taken by the student.
    #[serde(default)]
    pub(super) exclude: Option<String>,
}

impl AvailableExamsQuery {
    pub(super) fn excluded_ids(&self) -> Vec<String> {
        self.exclude
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}
