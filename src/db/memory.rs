// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use ahash::HashMap;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use parking_lot::RwLock;

/// In-memory content-addressed store. The development ledger never persists to
/// disk; everything committed by the chain lives here for the lifetime of the
/// process.
#[derive(Debug, Default)]
pub struct MemoryDB {
    blockchain_db: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl MemoryDB {
    pub fn len(&self) -> usize {
        self.blockchain_db.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blockchain_db.read().is_empty()
    }
}

impl Blockstore for MemoryDB {
    fn get(&self, k: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.blockchain_db.read().get(k).cloned())
    }

    fn put_keyed(&self, k: &Cid, block: &[u8]) -> anyhow::Result<()> {
        self.blockchain_db.write().insert(*k, block.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::dag_cbor_cid;

    #[test]
    fn get_returns_what_was_put() {
        let db = MemoryDB::default();
        let data = b"payload".to_vec();
        let cid = dag_cbor_cid(&data);

        assert_eq!(db.get(&cid).unwrap(), None);
        db.put_keyed(&cid, &data).unwrap();
        assert_eq!(db.get(&cid).unwrap(), Some(data));
        assert_eq!(db.len(), 1);
    }
}
