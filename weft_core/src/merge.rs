use crate::value::Value;

/// How [`merge`] resolves keys, lists and scalars present on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
	/// The incoming value always wins. Maps are merged one level deep: each
	/// incoming key replaces the existing one wholesale, existing-only keys
	/// survive. Lists and scalars are replaced.
	Override,
	/// Maps merge recursively, lists concatenate (existing first) and, for
	/// scalars or mismatched shapes, the existing value is kept.
	Combine,
}

/// Merge `src` into `dst` and return the result.
///
/// Metadata inheritance always calls this with [`MergeMode::Override`],
/// passing the child as `src` and the accumulated parent as `dst`.
pub fn merge(src: Value, dst: Value, mode: MergeMode) -> Value {
	match (src, dst) {
		(Value::Mapping(src), Value::Mapping(mut dst)) => {
			for (key, incoming) in src {
				let merged = match mode {
					MergeMode::Override => incoming,
					MergeMode::Combine => {
						match dst.remove(&key) {
							Some(existing) => merge(incoming, existing, mode),
							None => incoming,
						}
					}
				};
				dst.insert(key, merged);
			}
			Value::Mapping(dst)
		}
		(Value::Sequence(src), Value::Sequence(mut dst)) => {
			match mode {
				MergeMode::Override => Value::Sequence(src),
				MergeMode::Combine => {
					dst.extend(src);
					Value::Sequence(dst)
				}
			}
		}
		(src, dst) => {
			match mode {
				MergeMode::Override => src,
				MergeMode::Combine => dst,
			}
		}
	}
}

/// Fold a sequence of values, later values merged over earlier ones.
///
/// Returns `None` when `values` is empty so callers can tell "nothing found"
/// apart from an empty mapping.
pub fn merge_all(values: impl IntoIterator<Item = Value>, mode: MergeMode) -> Option<Value> {
	values.into_iter().fold(None, |acc, next| {
		Some(match acc {
			Some(acc) => merge(next, acc, mode),
			None => next,
		})
	})
}
