//! Signer tests

#[cfg(test)]
mod tests {
    use crate::account::Role;
    use crate::error::ErrorCode;
    use crate::signer::*;
    use crate::transaction::*;
    use crate::utils::encoding::{decode_hex, parse_address};
    use serde_json::json;

    const SENDER_KEY: &str = "0x45a915e4d060149eb4365960e6a7a45f334393093061116b197e3240065ff2d8";
    const SENDER: &str = "0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b";
    const FEE_PAYER_KEY: &str = "0xb9d5558443585bca6f225b935950e3f6e69f9da8a5809a83f51c3365dff53936";
    const FEE_PAYER: &str = "0x5a0043070275d9f6054307ee7348bd660849d90f";
    const OTHER_KEY: &str = "0x0e4ca6d38096ad99324de0dde108587e5d7c600165ae4cd6c2462c597458c2b8";

    fn address(s: &str) -> Address {
        parse_address(s, "test").unwrap()
    }

    fn value_transfer() -> Transaction {
        Transaction::from_json(
            TxType::ValueTransfer,
            &json!({
                "from": SENDER,
                "to": "0x7b65B75d204aBed71587c9E519a89277766EE1d0",
                "value": "0xa",
                "gas": "0xf4240",
                "gasPrice": "0x19",
                "chainId": "0x1",
                "nonce": 1234,
            }),
        )
        .unwrap()
    }

    fn memo_with_ratio() -> Transaction {
        Transaction::from_json(
            TxType::FeeDelegatedValueTransferMemoWithRatio,
            &json!({
                "from": SENDER,
                "to": "0x7b65B75d204aBed71587c9E519a89277766EE1d0",
                "value": "0xa",
                "input": "0x68656c6c6f",
                "gas": "0xf4240",
                "gasPrice": "0x19",
                "feeRatio": 30,
                "chainId": "0x1",
                "nonce": 1234,
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_keyring_derives_address() {
        let keyring = LocalKeyring::single(SENDER_KEY).unwrap();
        assert_eq!(keyring.address(), address(SENDER));
        for role in Role::ALL {
            assert_eq!(keyring.key_count(role), 1);
        }
    }

    #[test]
    fn test_invalid_private_keys() {
        assert!(matches!(
            LocalKeyring::single("0x1234"),
            Err(SignerError::InvalidPrivateKey(_))
        ));
        assert!(LocalKeyring::single(&format!("0x{}", "00".repeat(32))).is_err());
        assert!(LocalKeyring::single(&format!("0x{}", "ff".repeat(32))).is_err());
        assert!(LocalKeyring::single("not hex").is_err());
    }

    #[test]
    fn test_sign_reproduces_known_signature() {
        let keyring = LocalKeyring::single(SENDER_KEY).unwrap();
        let mut tx = value_transfer();
        tx.sign(&keyring, 0).unwrap();

        assert_eq!(
            tx.raw_transaction().unwrap(),
            "0x08f87a8204d219830f4240947b65b75d204abed71587c9e519a89277766ee1d00a94a94f5374fce5edbc8e2a8697c15331677e6ebf0bf845f84325a0f3d0cd43661cabf53425535817c5058c27781f478cb5459874feaa462ed3a29aa06748abe186269ff10b8100a4b7d7fea274b53ea2905acbf498dc8b5ab1bf4fbc"
        );
    }

    #[test]
    fn test_sender_and_fee_payer_signing() {
        let sender = LocalKeyring::single(SENDER_KEY).unwrap();
        let fee_payer = LocalKeyring::decoupled(address(FEE_PAYER), FEE_PAYER_KEY).unwrap();

        let mut tx = memo_with_ratio();
        tx.sign(&sender, 0).unwrap();
        tx.sign_as_fee_payer(&fee_payer, 0).unwrap();

        assert_eq!(tx.fee_payer(), Some(&address(FEE_PAYER)));
        assert_eq!(tx.signatures()[0].v, 0x26);
        assert_eq!(tx.fee_payer_signatures()[0].v, 0x25);
        assert_eq!(
            tx.raw_transaction().unwrap(),
            "0x12f8dd8204d219830f4240947b65b75d204abed71587c9e519a89277766ee1d00a94a94f5374fce5edbc8e2a8697c15331677e6ebf0b8568656c6c6f1ef845f84326a0769f0afdc310289f9b24decb5bb765c8d7a87a6a4ae28edffb8b7085bbd9bc78a06a7b970eea026e60ac29bb52aee10661a4222e6bdcdfb3839a80586e584586b4945a0043070275d9f6054307ee7348bd660849d90ff845f84325a0c1c54bdc72ce7c08821329bf50542535fac74f4bba5de5b7881118a461d52834a03a3a64878d784f9af91c2e3ab9c90f17144c47cfd9951e3588c75063c0649ecd"
        );
    }

    #[test]
    fn test_recover_address() {
        let keyring = LocalKeyring::single(SENDER_KEY).unwrap();
        let tx = value_transfer();
        let hash = tx.hash_for_signature().unwrap();

        let signature = keyring.sign(&hash, 1001, Role::Transaction, 0).unwrap();
        assert!(signature.v == 2037 || signature.v == 2038);
        assert_eq!(signature.chain_id(), Some(1001));
        assert_eq!(signature.recover_address(&hash, 1001).unwrap(), address(SENDER));

        // Wrong chain id cannot be mapped to a recovery id
        assert!(signature.recover_address(&hash, 1).is_err());
    }

    #[test]
    fn test_address_mismatch() {
        let other = LocalKeyring::single(OTHER_KEY).unwrap();
        let mut tx = value_transfer();

        let err = tx.sign(&other, 0).unwrap_err();
        assert_eq!(
            err.message,
            "The from address of the transaction is different with the address of the keyring to use."
        );
        assert!(tx.signatures().is_empty());

        let mut fd = memo_with_ratio();
        fd.set_fee_payer(address(FEE_PAYER)).unwrap();
        let err = fd.sign_as_fee_payer(&other, 0).unwrap_err();
        assert_eq!(
            err.message,
            "The feePayer address of the transaction is different with the address of the keyring to use."
        );
    }

    #[test]
    fn test_fee_payer_adopts_signer_address() {
        let other = LocalKeyring::single(OTHER_KEY).unwrap();
        let mut tx = memo_with_ratio();
        assert_eq!(tx.fee_payer(), None);

        tx.sign_as_fee_payer(&other, 0).unwrap();
        assert_eq!(tx.fee_payer(), Some(&other.address()));

        let hash = tx.hash_for_fee_payer_signature().unwrap();
        assert_eq!(
            tx.fee_payer_signatures()[0].recover_address(&hash, 1).unwrap(),
            other.address()
        );
    }

    #[test]
    fn test_fee_payer_signing_needs_delegation() {
        let keyring = LocalKeyring::single(SENDER_KEY).unwrap();
        let mut tx = value_transfer();
        let err = tx.sign_as_fee_payer(&keyring, 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
    }

    #[test]
    fn test_index_out_of_range() {
        let keyring = LocalKeyring::multiple(address(SENDER), &[SENDER_KEY, OTHER_KEY]).unwrap();
        let mut tx = value_transfer();

        let err = tx.sign(&keyring, 10).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedKey);
        assert_eq!(
            err.message,
            "Invalid index(10): index must be less than the length of keys(2)."
        );
        assert!(tx.signatures().is_empty());
    }

    #[test]
    fn test_sign_all_with_multiple_keys() {
        let keyring = LocalKeyring::multiple(address(SENDER), &[SENDER_KEY, OTHER_KEY]).unwrap();
        let mut tx = value_transfer();
        tx.sign_all(&keyring).unwrap();

        let hash = tx.hash_for_signature().unwrap();
        let signers: Vec<Address> = tx
            .signatures()
            .iter()
            .map(|sig| sig.recover_address(&hash, 1).unwrap())
            .collect();
        assert_eq!(
            signers,
            vec![address(SENDER), LocalKeyring::single(OTHER_KEY).unwrap().address()]
        );
    }

    #[test]
    fn test_role_selection() {
        let keyring = LocalKeyring::role_based(
            address(SENDER),
            [&[SENDER_KEY][..], &[OTHER_KEY, SENDER_KEY][..], &[][..]],
        )
        .unwrap();

        let mut update = Transaction::builder(TxType::AccountUpdate)
            .from(address(SENDER))
            .gas(300_000)
            .gas_price(25)
            .nonce(0)
            .chain_id(1)
            .account(crate::account::AccountKey::Legacy)
            .build()
            .unwrap();
        assert_eq!(update.sender_role(), Role::AccountUpdate);

        update.sign_all(&keyring).unwrap();
        assert_eq!(update.signatures().len(), 2);

        let mut fd = memo_with_ratio();
        let err = fd.sign_all_as_fee_payer(&keyring).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedKey);
        assert_eq!(fd.fee_payer(), None);
    }

    #[test]
    fn test_legacy_signing() {
        let keyring = LocalKeyring::single(SENDER_KEY).unwrap();
        let mut tx = Transaction::builder(TxType::Legacy)
            .to(address(FEE_PAYER))
            .value(1)
            .gas(21000)
            .gas_price(25)
            .nonce(0)
            .chain_id(1)
            .build()
            .unwrap();

        tx.sign(&keyring, 0).unwrap();
        assert_eq!(tx.from_address(), Some(&address(SENDER)));
        assert!(tx.sign(&keyring, 0).is_err());

        let multi = LocalKeyring::multiple(address(SENDER), &[SENDER_KEY, OTHER_KEY]).unwrap();
        let mut fresh = tx.clone();
        fresh.signatures.clear();
        assert!(fresh.sign_all(&multi).is_err());
        assert!(fresh.signatures().is_empty());
    }

    #[test]
    fn test_missing_chain_id_is_reported_before_signing() {
        let keyring = LocalKeyring::single(SENDER_KEY).unwrap();
        let mut tx = value_transfer();
        tx.chain_id = None;

        let err = tx.sign(&keyring, 0).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingField);
    }

    #[test]
    fn test_keyring_debug_hides_keys() {
        let keyring = LocalKeyring::single(SENDER_KEY).unwrap();
        let rendered = format!("{:?}", keyring);
        let key_hex = hex::encode(decode_hex(SENDER_KEY).unwrap());
        assert!(!rendered.contains(&key_hex));
        assert!(rendered.contains("key_counts"));
    }
}
