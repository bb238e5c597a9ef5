//! Legacy (type 0) transactions with EIP-155 replay protection

use bytes::Bytes;
use evmbind_crypto::{keccak256, recover_address, Credentials, Signature};
use evmbind_primitives::{Address, Nonce, H256, U256};
use rlp::{Rlp, RlpStream};

use crate::TypesError;

/// Unsigned transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Sender
    pub from: Address,
    /// Recipient (None for contract creation)
    pub to: Option<Address>,
    /// Sender nonce
    pub nonce: Nonce,
    /// Gas price in wei
    pub gas_price: U256,
    /// Gas limit
    pub gas_limit: U256,
    /// Value to transfer in wei
    pub value: U256,
    /// Call data or deployment code
    pub data: Bytes,
}

impl TransactionRequest {
    /// Whether this request deploys a contract
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// EIP-155 signing hash:
    /// keccak256(RLP([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]))
    pub fn signing_hash(&self, chain_id: u64) -> H256 {
        let mut stream = RlpStream::new_list(9);
        self.append_fields(&mut stream);
        stream.append(&chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        keccak256(stream.out())
    }

    fn append_fields(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        if let Some(to) = &self.to {
            stream.append(to);
        } else {
            stream.append_empty_data();
        }
        stream.append(&self.value);
        stream.append(&self.data.to_vec());
    }

    /// Sign for `chain_id`, consuming the request
    ///
    /// # Errors
    ///
    /// - [`TypesError::InvalidChainId`] for chain id 0
    /// - [`TypesError::SignerMismatch`] when `credentials` do not control `from`
    pub fn sign(
        self,
        chain_id: u64,
        credentials: &Credentials,
    ) -> Result<SignedTransaction, TypesError> {
        if chain_id == 0 {
            return Err(TypesError::InvalidChainId);
        }
        if credentials.address() != self.from {
            return Err(TypesError::SignerMismatch {
                signer: credentials.address(),
                from: self.from,
            });
        }

        let v_offset = chain_id
            .checked_mul(2)
            .and_then(|x| x.checked_add(35))
            .ok_or(TypesError::InvalidChainId)?;

        let hash = self.signing_hash(chain_id);
        let signature = credentials.sign_hash(&hash)?;

        let tx_sig = TxSignature {
            v: u64::from(signature.v) + v_offset,
            r: H256::from_bytes(signature.r),
            s: H256::from_bytes(signature.s),
        };
        Ok(SignedTransaction::assemble(self, chain_id, tx_sig))
    }
}

/// EIP-155 signature components
#[derive(Clone, PartialEq, Eq)]
pub struct TxSignature {
    /// recid + 35 + 2 * chainId
    pub v: u64,
    /// R component
    pub r: H256,
    /// S component
    pub s: H256,
}

impl std::fmt::Debug for TxSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxSignature").field("v", &self.v).finish_non_exhaustive()
    }
}

/// A signed transaction together with its raw encoding and hash.
///
/// Immutable: the raw bytes are what gets broadcast and the hash is the
/// one the ledger will report.
#[derive(Clone)]
pub struct SignedTransaction {
    request: TransactionRequest,
    chain_id: u64,
    signature: TxSignature,
    raw: Bytes,
    hash: H256,
}

impl SignedTransaction {
    fn assemble(request: TransactionRequest, chain_id: u64, signature: TxSignature) -> Self {
        let mut stream = RlpStream::new_list(9);
        request.append_fields(&mut stream);
        stream.append(&signature.v);
        stream.append(&signature.r.to_u256());
        stream.append(&signature.s.to_u256());

        let raw = Bytes::from(stream.out().to_vec());
        let hash = keccak256(&raw);
        Self {
            request,
            chain_id,
            signature,
            raw,
            hash,
        }
    }

    /// Decode raw legacy transaction bytes and recover the sender
    pub fn decode(raw: &[u8]) -> Result<Self, TypesError> {
        let rlp = Rlp::new(raw);
        if !rlp.is_list() {
            return Err(TypesError::Decode("transaction must be an RLP list".to_string()));
        }
        let item_count = rlp.item_count().map_err(decode_err)?;
        if item_count != 9 {
            return Err(TypesError::Decode(format!(
                "legacy transaction must have 9 items, got {}",
                item_count
            )));
        }

        let to_bytes: Vec<u8> = rlp.val_at(3).map_err(decode_err)?;
        let to = match to_bytes.len() {
            0 => None,
            20 => Some(Address::from_slice(&to_bytes).map_err(|e| TypesError::Decode(e.to_string()))?),
            n => return Err(TypesError::Decode(format!("invalid to address length: {}", n))),
        };
        let data: Vec<u8> = rlp.val_at(5).map_err(decode_err)?;

        let mut request = TransactionRequest {
            from: Address::ZERO,
            to,
            nonce: rlp.val_at(0).map_err(decode_err)?,
            gas_price: rlp.val_at(1).map_err(decode_err)?,
            gas_limit: rlp.val_at(2).map_err(decode_err)?,
            value: rlp.val_at(4).map_err(decode_err)?,
            data: Bytes::from(data),
        };

        let v: u64 = rlp.val_at(6).map_err(decode_err)?;
        let r: U256 = rlp.val_at(7).map_err(decode_err)?;
        let s: U256 = rlp.val_at(8).map_err(decode_err)?;
        if v < 35 {
            return Err(TypesError::Decode(format!("v = {} lacks replay protection", v)));
        }
        let chain_id = (v - 35) / 2;
        let recovery_id = ((v - 35) % 2) as u8;

        let hash = request.signing_hash(chain_id);
        let signature = Signature {
            r: *H256::from_u256(&r).as_bytes(),
            s: *H256::from_u256(&s).as_bytes(),
            v: recovery_id,
        };
        request.from = recover_address(&hash, &signature)?;

        Ok(Self {
            request,
            chain_id,
            signature: TxSignature {
                v,
                r: H256::from_u256(&r),
                s: H256::from_u256(&s),
            },
            raw: Bytes::copy_from_slice(raw),
            hash: keccak256(raw),
        })
    }

    /// The request that was signed
    pub fn request(&self) -> &TransactionRequest {
        &self.request
    }

    /// Chain id the signature commits to
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Signature components
    pub fn signature(&self) -> &TxSignature {
        &self.signature
    }

    /// RLP encoding, as broadcast
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Transaction hash (keccak256 of the raw encoding)
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// Sender nonce
    pub fn nonce(&self) -> Nonce {
        self.request.nonce
    }

    /// Sender address
    pub fn from(&self) -> Address {
        self.request.from
    }
}

impl std::fmt::Debug for SignedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedTransaction")
            .field("hash", &self.hash)
            .field("nonce", &self.request.nonce)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

fn decode_err(e: rlp::DecoderError) -> TypesError {
    TypesError::Decode(e.to_string())
}

/// Calculate CREATE address: keccak256(RLP([sender, nonce]))[12:]
pub fn create_address(sender: &Address, nonce: Nonce) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(sender);
    stream.append(&nonce);
    let hash = keccak256(stream.out());

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EIP155_KEY: &str = "4646464646464646464646464646464646464646464646464646464646464646";

    fn eip155_request(from: Address) -> TransactionRequest {
        TransactionRequest {
            from,
            to: Some(Address::from_bytes([0x35; 20])),
            nonce: 9,
            gas_price: U256::from(20_000_000_000u64),
            gas_limit: U256::from(21_000u64),
            value: U256::from(1_000_000_000_000_000_000u64),
            data: Bytes::new(),
        }
    }

    #[test]
    fn test_eip155_signing_hash() {
        let hash = eip155_request(Address::ZERO).signing_hash(1);
        assert_eq!(
            hash.to_hex(),
            "0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_eip155_signed_encoding() {
        let creds = Credentials::from_private_key_hex(EIP155_KEY).unwrap();
        let signed = eip155_request(creds.address()).sign(1, &creds).unwrap();

        assert_eq!(signed.signature().v, 37);
        assert_eq!(
            hex::encode(signed.raw()),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn test_decode_recovers_sender() {
        let creds = Credentials::random();
        let request = TransactionRequest {
            from: creds.address(),
            to: None,
            nonce: 3,
            gas_price: U256::from(7u64),
            gas_limit: U256::from(6_721_975u64),
            value: U256::zero(),
            data: Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]),
        };
        let signed = request.clone().sign(1337, &creds).unwrap();

        let decoded = SignedTransaction::decode(signed.raw()).unwrap();
        assert_eq!(decoded.request(), &request);
        assert_eq!(decoded.chain_id(), 1337);
        assert_eq!(decoded.hash(), signed.hash());
        assert!(decoded.request().is_contract_creation());
    }

    #[test]
    fn test_sign_rejects_chain_zero_and_foreign_sender() {
        let creds = Credentials::random();
        let request = eip155_request(creds.address());
        assert!(matches!(
            request.clone().sign(0, &creds),
            Err(TypesError::InvalidChainId)
        ));

        let foreign = eip155_request(Address::from_bytes([1; 20]));
        assert!(matches!(
            foreign.sign(1, &creds),
            Err(TypesError::SignerMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(SignedTransaction::decode(&[0x01, 0x02]).is_err());
        assert!(SignedTransaction::decode(&[0xc0]).is_err());
    }

    #[test]
    fn test_create_address() {
        let sender = Address::from_hex("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        assert_eq!(
            create_address(&sender, 0).to_hex(),
            "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"
        );
        assert_eq!(
            create_address(&sender, 1).to_hex(),
            "0x343c43a37d37dff08ae8c4a11544c718abb4fcf8"
        );
    }

    #[test]
    fn test_debug_hides_signature() {
        let creds = Credentials::random();
        let signed = eip155_request(creds.address()).sign(1, &creds).unwrap();
        let debug = format!("{:?}", signed);
        assert!(debug.contains("hash"));
        assert!(!debug.contains(&signed.signature().r.to_hex()));
    }
}
