use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

pub trait LabelSelectorExt {
    /// A selector without labels or expressions, which the API server would
    /// treat as selecting every pod.
    fn is_empty(&self) -> bool;
}

impl LabelSelectorExt for LabelSelector {
    fn is_empty(&self) -> bool {
        self.match_labels.as_ref().is_none_or(std::collections::BTreeMap::is_empty)
            && self.match_expressions.as_ref().is_none_or(Vec::is_empty)
    }
}
