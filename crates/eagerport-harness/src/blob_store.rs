use bytes::Bytes;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlobId(usize);

impl BlobId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Append-only owner of the parameter blobs referenced by delegated nodes.
///
/// Each blob is its own reference-counted allocation, so growing the store
/// never moves bytes a node already points at.
#[derive(Debug, Default)]
pub struct BlobStore {
    blobs: Vec<Bytes>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `blob` and returns its id plus a shared view for the node.
    pub fn push(&mut self, blob: Bytes) -> (BlobId, Bytes) {
        let id = BlobId(self.blobs.len());
        let view = blob.clone();
        self.blobs.push(blob);
        (id, view)
    }

    pub fn get(&self, id: BlobId) -> Option<&Bytes> {
        self.blobs.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.blobs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_survive_growth() {
        let mut store = BlobStore::new();
        assert!(store.is_empty());
        let (first, view) = store.push(Bytes::from(vec![1u8, 2, 3]));
        for i in 0..64u8 {
            store.push(Bytes::from(vec![i; 16]));
        }
        assert!(!store.is_empty());
        assert_eq!(store.len(), 65);
        assert_eq!(first.index(), 0);
        assert_eq!(store.get(first).unwrap().as_ptr(), view.as_ptr());
        assert_eq!(&view[..], &[1, 2, 3]);
    }
}
