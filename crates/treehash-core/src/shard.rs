//! Balanced partitioning of the listing into shards.

/// Splits `items` into exactly `count` contiguous shards.
///
/// Shard lengths are `len / count` or one more; the first `len % count`
/// shards get the extra element. Concatenating the shards in order gives back
/// `items`. Returns an empty vec if `count` is 0.
pub fn partition<T: Clone>(items: &[T], count: usize) -> Vec<Vec<T>> {
    if count == 0 {
        return Vec::new();
    }

    let base = items.len() / count;
    let remainder = items.len() % count;

    let mut out = Vec::with_capacity(count);
    let mut offset = 0usize;
    for i in 0..count {
        let len = base + if i < remainder { 1 } else { 0 };
        out.push(items[offset..offset + len].to_vec());
        offset += len;
    }

    out
}
