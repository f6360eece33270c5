// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod memory;

pub use memory::MemoryDB;

use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use multihash_codetable::Code;
use multihash_derive::MultihashDigest as _;
use serde::{Serialize, de::DeserializeOwned};

/// Content identifier of `data` as a DAG-CBOR block.
pub fn dag_cbor_cid(data: &[u8]) -> Cid {
    Cid::new_v1(fvm_ipld_encoding::DAG_CBOR, Code::Blake2b256.digest(data))
}

/// Serializes `value` as DAG-CBOR and persists it under its content
/// identifier.
pub fn put_cbor<DB, T>(db: &DB, value: &T) -> anyhow::Result<Cid>
where
    DB: Blockstore,
    T: Serialize,
{
    let data = fvm_ipld_encoding::to_vec(value)?;
    let cid = dag_cbor_cid(&data);
    db.put_keyed(&cid, &data)?;
    Ok(cid)
}

/// Loads and deserializes a DAG-CBOR block. Absence is not an error.
pub fn get_cbor<DB, T>(db: &DB, cid: &Cid) -> anyhow::Result<Option<T>>
where
    DB: Blockstore,
    T: DeserializeOwned,
{
    match db.get(cid)? {
        Some(data) => Ok(Some(fvm_ipld_encoding::from_slice(&data)?)),
        None => Ok(None),
    }
}
