use super::DetectedObject;

/// Keeps the objects whose type is one of `targets`, in their original order.
///
/// Matching is exact; objects of any other type are dropped without error.
pub fn filter_by_type<S: AsRef<str>>(
    objects: &[DetectedObject],
    targets: &[S],
) -> Vec<DetectedObject> {
    objects
        .iter()
        .filter(|object| {
            targets
                .iter()
                .any(|target| target.as_ref() == object.object_type)
        })
        .cloned()
        .collect()
}
