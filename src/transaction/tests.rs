//! Transaction tests

#[cfg(test)]
mod tests {
    use crate::account::{AccountKey, RoleBased};
    use crate::error::ErrorCode;
    use crate::transaction::*;
    use crate::utils::encoding::encode_hex;
    use serde_json::json;

    const CHAIN_ID: u64 = 1001;

    fn addr(byte: u8) -> Address {
        [byte; 20]
    }

    /// Signature carrying `CHAIN_ID` in `v`
    fn sig(seed: u8) -> SignatureData {
        SignatureData::new(CHAIN_ID * 2 + 35 + u64::from(seed % 2), [seed; 32], [seed.wrapping_add(1); 32])
    }

    fn sample(tx_type: TxType) -> Transaction {
        let mut builder = Transaction::builder(tx_type)
            .gas(90_000)
            .gas_price(25_000_000_000)
            .nonce(7)
            .chain_id(CHAIN_ID)
            .signatures(vec![sig(3)]);

        if !tx_type.is_legacy() {
            builder = builder.from(addr(1));
        }

        builder = match tx_type.kind() {
            TxKind::Legacy => builder.to(addr(2)).value(5).input(vec![0xab]),
            TxKind::ValueTransfer => builder.to(addr(2)).value(10),
            TxKind::ValueTransferMemo => builder.to(addr(2)).value(10).input(b"hello".to_vec()),
            TxKind::AccountUpdate => builder.account(AccountKey::Legacy),
            TxKind::SmartContractDeploy => builder.value(0).input(vec![0x60, 0x80]).human_readable(false),
            TxKind::SmartContractExecution => builder.to(addr(3)).value(1).input(vec![0xa9, 0x05]),
            TxKind::Cancel => builder,
            TxKind::ChainDataAnchoring => builder.input(vec![0xf8, 0x01]),
        };

        if tx_type.is_fee_delegated() {
            builder = builder.fee_payer(addr(9)).fee_payer_signatures(vec![sig(4)]);
        }
        if tx_type.has_fee_ratio() {
            builder = builder.fee_ratio(FeeRatio::new(30).unwrap());
        }

        builder.build().unwrap()
    }

    fn value_transfer_json() -> serde_json::Value {
        json!({
            "from": "0xa94f5374Fce5edBC8E2a8697C15331677e6EbF0B",
            "to": "0x7b65B75d204aBed71587c9E519a89277766EE1d0",
            "value": "0xa",
            "gas": "0xf4240",
        })
    }

    // === Type table ===

    #[test]
    fn test_type_table() {
        assert_eq!(TxType::all().count(), 22);

        for tx_type in TxType::all().filter(|t| !t.is_legacy()) {
            assert_eq!(TxType::from_tag(tx_type.tag()), Some(tx_type));
            assert_eq!(TxType::from_name(tx_type.name()), Some(tx_type));
            assert_eq!(TxType::from_parts(tx_type.kind(), tx_type.fee_mode()), Some(tx_type));
        }

        assert_eq!(TxType::ValueTransfer.tag(), 0x08);
        assert_eq!(TxType::FeeDelegatedChainDataAnchoringWithRatio.tag(), 0x4a);
        assert_eq!(TxType::FeeDelegatedValueTransferMemoWithRatio.name(), "TxTypeFeeDelegatedValueTransferMemoWithRatio");
        assert_eq!(TxType::Legacy.name(), "TxTypeLegacyTransaction");
        assert_eq!(TxType::from_parts(TxKind::Legacy, FeeMode::Delegated), None);
    }

    // === Fee ratio ===

    #[test]
    fn test_fee_ratio_bounds() {
        for accepted in [json!(30), json!(88), json!(1), json!(99), json!("0x1e")] {
            assert!(FeeRatio::from_json(&accepted).is_ok(), "{}", accepted);
        }
        assert_eq!(FeeRatio::from_json(&json!("0x58")).unwrap().value(), 88);

        for rejected in [json!(0), json!(100), json!(-1), json!(101), json!("0x0")] {
            let err = FeeRatio::from_json(&rejected).unwrap_err();
            assert_eq!(err.message, "Invalid feeRatio: feeRatio is out of range. [1, 99]", "{}", rejected);
        }

        for wrong_type in [json!({}), json!([]), json!("nonHexString"), json!(30.5), json!(true)] {
            let err = FeeRatio::from_json(&wrong_type).unwrap_err();
            assert!(err.message.starts_with("Invalid type fo feeRatio"), "{}", wrong_type);
        }
    }

    #[test]
    fn test_fee_ratio_checked_at_construction() {
        let mut fields = value_transfer_json();
        fields["feeRatio"] = json!(101);
        let err = Transaction::from_json(TxType::FeeDelegatedValueTransferWithRatio, &fields).unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);

        fields["feeRatio"] = json!(88);
        let tx = Transaction::from_json(TxType::FeeDelegatedValueTransferWithRatio, &fields).unwrap();
        assert_eq!(tx.fee_ratio().map(FeeRatio::value), Some(88));
    }

    // === Field rules ===

    #[test]
    fn test_required_fields() {
        for field in ["from", "to", "value", "gas"] {
            let mut fields = value_transfer_json();
            fields.as_object_mut().unwrap().remove(field);

            let err = Transaction::from_json(TxType::ValueTransfer, &fields).unwrap_err();
            assert_eq!(err.message, format!("\"{}\" is missing", field));
        }

        let err = Transaction::from_json(TxType::SmartContractDeploy, &json!({
            "from": "0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b",
            "gas": 100000,
        }))
        .unwrap_err();
        assert_eq!(err.message, "\"input\" is missing");

        let err = Transaction::from_json(TxType::FeeDelegatedCancelWithRatio, &json!({
            "from": "0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b",
            "gas": 100000,
        }))
        .unwrap_err();
        assert_eq!(err.message, "\"feeRatio\" is missing");
    }

    #[test]
    fn test_forbidden_fields() {
        let unnecessary = [
            ("data", json!("0x01")),
            ("input", json!("0x01")),
            ("codeFormat", json!(0)),
            ("feePayer", json!("0x5a0043070275d9f6054307ee7348bd660849d90f")),
            ("feePayerSignatures", json!([])),
            ("feeRatio", json!(30)),
            ("account", json!("0x01c0")),
            ("key", json!("0x01")),
            ("legacyKey", json!(true)),
            ("publicKey", json!("0x01")),
            ("failKey", json!(true)),
            ("multisig", json!({})),
            ("roleTransactionKey", json!({})),
            ("roleAccountUpdateKey", json!({})),
            ("roleFeePayerKey", json!({})),
            ("humanReadable", json!(false)),
        ];

        for (name, value) in unnecessary {
            let mut fields = value_transfer_json();
            fields[name] = value;

            let err = Transaction::from_json(TxType::ValueTransfer, &fields).unwrap_err();
            assert_eq!(
                err.message,
                format!("\"{}\" cannot be used with TxTypeValueTransfer transaction", name)
            );
        }
    }

    #[test]
    fn test_invalid_addresses() {
        let mut fields = value_transfer_json();
        fields["from"] = json!("invalidAddress");
        let err = Transaction::from_json(TxType::ValueTransfer, &fields).unwrap_err();
        assert_eq!(err.message, "Invalid address of from: invalidAddress");

        let mut fields = value_transfer_json();
        fields["to"] = json!("0x1234");
        let err = Transaction::from_json(TxType::ValueTransfer, &fields).unwrap_err();
        assert_eq!(err.message, "Invalid address of to: 0x1234");

        let mut fields = value_transfer_json();
        fields["feePayer"] = json!("0xnope");
        let err = Transaction::from_json(TxType::FeeDelegatedValueTransfer, &fields).unwrap_err();
        assert_eq!(err.message, "Invalid address of fee payer: 0xnope");
    }

    #[test]
    fn test_fee_payer_signatures_need_fee_payer() {
        let mut fields = value_transfer_json();
        fields["feePayerSignatures"] = json!([["0x25", format!("0x{}", "11".repeat(32)), format!("0x{}", "22".repeat(32))]]);

        let err = Transaction::from_json(TxType::FeeDelegatedValueTransfer, &fields).unwrap_err();
        assert_eq!(err.message, "\"feePayer\" is missing: feePayer must be defined with feePayerSignatures.");

        // The unset sentinel counts as missing
        fields["feePayer"] = json!("0x");
        assert!(Transaction::from_json(TxType::FeeDelegatedValueTransfer, &fields).is_err());
    }

    #[test]
    fn test_deploy_to_and_code_format() {
        let fields = json!({
            "from": "0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b",
            "to": "0x",
            "input": "0x6080",
            "gas": 100000,
            "codeFormat": "0x0",
            "humanReadable": false,
        });
        let tx = Transaction::from_json(TxType::SmartContractDeploy, &fields).unwrap();
        assert_eq!(tx.payload().value(), Some(0));

        let mut with_to = fields.clone();
        with_to["to"] = json!("0x7b65b75d204abed71587c9e519a89277766ee1d0");
        let err = Transaction::from_json(TxType::SmartContractDeploy, &with_to).unwrap_err();
        assert_eq!(err.message, "\"to\" cannot be used with TxTypeSmartContractDeploy transaction");

        let mut wasm = fields;
        wasm["codeFormat"] = json!(1);
        assert!(Transaction::from_json(TxType::SmartContractDeploy, &wasm).is_err());
    }

    #[test]
    fn test_input_and_data_exclusive() {
        let fields = json!({
            "from": "0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b",
            "gas": 100000,
            "input": "0x01",
            "data": "0x01",
        });
        assert!(Transaction::from_json(TxType::ChainDataAnchoring, &fields).is_err());

        let fields = json!({
            "from": "0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b",
            "gas": 100000,
            "data": "0x0102",
        });
        let tx = Transaction::from_json(TxType::ChainDataAnchoring, &fields).unwrap();
        assert_eq!(tx.payload().input(), Some(&[0x01, 0x02][..]));
    }

    #[test]
    fn test_legacy_contract_creation_needs_input() {
        let err = Transaction::builder(TxType::Legacy).gas(21000).build().unwrap_err();
        assert_eq!(err.message, "contract creation without any data provided");

        assert!(Transaction::builder(TxType::Legacy).gas(21000).input(vec![0x60]).build().is_ok());
    }

    // === Codec ===

    #[test]
    fn test_round_trip_every_type() {
        for tx_type in TxType::all() {
            let tx = sample(tx_type);
            let encoded = tx.rlp_encoding().unwrap();

            let decoded = Transaction::decode(&encoded).unwrap();
            assert_eq!(decoded, tx, "{}", tx_type);
            assert_eq!(decoded.rlp_encoding().unwrap(), encoded);
            assert_eq!(detect_type(&encoded).unwrap(), tx_type);
        }
    }

    #[test]
    fn test_round_trip_account_update_with_role_based_key() {
        let role_based = RoleBased::new([AccountKey::Legacy, AccountKey::Fail, AccountKey::Nil]).unwrap();
        let tx = Transaction::builder(TxType::FeeDelegatedAccountUpdateWithRatio)
            .from(addr(1))
            .gas(300_000)
            .gas_price(25)
            .nonce(0)
            .chain_id(CHAIN_ID)
            .account(AccountKey::RoleBased(role_based))
            .fee_ratio(FeeRatio::new(50).unwrap())
            .signatures(vec![sig(1)])
            .build()
            .unwrap();

        let decoded = Transaction::from_raw_transaction(&tx.raw_transaction().unwrap()).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn test_unsigned_encoding_uses_placeholder() {
        let tx = Transaction::builder(TxType::Cancel)
            .from(addr(1))
            .gas(21000)
            .gas_price(25)
            .nonce(1)
            .chain_id(1)
            .build()
            .unwrap();

        let hex = tx.raw_transaction().unwrap();
        assert!(hex.ends_with("c4c3018080"), "{}", hex);

        // No signature means no chain id on the wire
        let decoded = Transaction::from_raw_transaction(&hex).unwrap();
        assert!(decoded.signatures().is_empty());
        assert_eq!(decoded.chain_id(), None);
    }

    #[test]
    fn test_decode_errors() {
        let err = Transaction::decode(&[0x01, 0xc0]).unwrap_err();
        assert_eq!(err.code, ErrorCode::Decode);

        assert_eq!(Transaction::decode(&[]).unwrap_err().code, ErrorCode::Decode);

        let encoded = sample(TxType::ValueTransfer).rlp_encoding().unwrap();
        let err = Transaction::decode_as(TxType::FeeDelegatedValueTransfer, &encoded).unwrap_err();
        assert_eq!(err.code, ErrorCode::TypeMismatch);
        assert!(Transaction::decode_as(TxType::ValueTransfer, &encoded).is_ok());

        let mut trailing = encoded.clone();
        trailing.push(0x00);
        assert_eq!(Transaction::decode(&trailing).unwrap_err().code, ErrorCode::Decode);

        // Wrong tag on a well-formed body
        let mut retagged = encoded;
        retagged[0] = TxType::Cancel.tag();
        assert_eq!(Transaction::decode(&retagged).unwrap_err().code, ErrorCode::Decode);
    }

    #[test]
    fn test_missing_defaults() {
        let mut fields = value_transfer_json();
        fields["gasPrice"] = json!("0x19");
        fields["chainId"] = json!("0x1");
        let tx = Transaction::from_json(TxType::ValueTransfer, &fields).unwrap();
        let err = tx.rlp_encoding().unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingField);
        assert_eq!(
            err.message,
            "nonce is undefined. Define nonce in transaction or use 'fill_transaction' to fill values."
        );

        let mut fields = value_transfer_json();
        fields["nonce"] = json!(1234);
        fields["chainId"] = json!("0x1");
        let tx = Transaction::from_json(TxType::ValueTransfer, &fields).unwrap();
        assert!(tx.transaction_hash().unwrap_err().message.starts_with("gasPrice is undefined"));

        let mut fields = value_transfer_json();
        fields["nonce"] = json!(1234);
        fields["gasPrice"] = json!("0x19");
        let tx = Transaction::from_json(TxType::ValueTransfer, &fields).unwrap();
        assert!(tx.sender_tx_hash().unwrap_err().message.starts_with("chainId is undefined"));
        assert!(tx.rlp_encoding_for_signature().unwrap_err().is(ErrorCode::MissingField));
    }

    #[test]
    fn test_fee_payer_payload_only_for_fee_delegated() {
        let tx = sample(TxType::ValueTransfer);
        assert!(tx.rlp_encoding_for_fee_payer_signature().is_err());

        let fd = sample(TxType::FeeDelegatedValueTransfer);
        let sender_payload = fd.rlp_encoding_for_signature().unwrap();
        let fee_payer_payload = fd.rlp_encoding_for_fee_payer_signature().unwrap();
        assert_ne!(sender_payload, fee_payer_payload);
    }

    // === Hashes ===

    #[test]
    fn test_sender_tx_hash_ignores_fee_payer_block() {
        let tx = sample(TxType::FeeDelegatedValueTransferMemo);
        let sender_hash = tx.sender_tx_hash().unwrap();
        let tx_hash = tx.transaction_hash().unwrap();
        assert_ne!(sender_hash, tx_hash);

        let mut resigned = tx.clone();
        resigned.append_fee_payer_signatures([sig(8)]).unwrap();
        assert_eq!(resigned.sender_tx_hash().unwrap(), sender_hash);
        assert_ne!(resigned.transaction_hash().unwrap(), tx_hash);

        let mut repaid = tx.clone();
        repaid.set_fee_payer(addr(10)).unwrap();
        assert_eq!(repaid.sender_tx_hash().unwrap(), sender_hash);

        let mut renonced = tx;
        renonced.set_nonce(8);
        assert_ne!(renonced.sender_tx_hash().unwrap(), sender_hash);
    }

    #[test]
    fn test_sender_tx_hash_equals_tx_hash_without_delegation() {
        let tx = sample(TxType::SmartContractExecution);
        assert_eq!(tx.sender_tx_hash().unwrap(), tx.transaction_hash().unwrap());
    }

    // === Append ===

    #[test]
    fn test_append_signature_forms() {
        let mut tx = sample(TxType::ValueTransfer);
        let single = json!(["0x0fea", format!("0x{}", "aa".repeat(32)), format!("0x{}", "bb".repeat(32))]);
        tx.append_signatures_json(&single).unwrap();
        assert_eq!(tx.signatures().len(), 2);
        assert_eq!(tx.signatures()[1].v, 0x0fea);

        let nested = json!([
            ["0x0fe9", format!("0x{}", "cc".repeat(32)), format!("0x{}", "dd".repeat(32))],
            ["0x0fea", format!("0x{}", "ee".repeat(32)), format!("0x{}", "ff".repeat(32))],
        ]);
        tx.append_signatures_json(&nested).unwrap();
        assert_eq!(tx.signatures().len(), 4);
        assert_eq!(tx.signatures()[2].r, [0xcc; 32]);
        assert_eq!(tx.signatures()[3].r, [0xee; 32]);
    }

    #[test]
    fn test_append_rejects_malformed_input() {
        let mut tx = sample(TxType::ValueTransfer);
        let before = tx.clone();

        for bad in [json!("0x25"), json!({"v": "0x25"}), json!([["0x25", "0x01"]]), json!([["0x25", 1, 2]])] {
            let err = tx.append_signatures_json(&bad).unwrap_err();
            assert_eq!(err.code, ErrorCode::TypeError, "{}", bad);
        }
        assert_eq!(tx, before);
    }

    #[test]
    fn test_append_fee_payer_signatures_requires_delegation() {
        let mut tx = sample(TxType::ChainDataAnchoring);
        assert!(tx.append_fee_payer_signatures([sig(1)]).is_err());

        let mut fd = sample(TxType::FeeDelegatedChainDataAnchoring);
        fd.append_fee_payer_signatures([sig(1), sig(2)]).unwrap();
        assert_eq!(fd.fee_payer_signatures().len(), 3);
    }

    #[test]
    fn test_append_fee_payer_signatures_requires_fee_payer() {
        let mut tx = Transaction::builder(TxType::FeeDelegatedCancel)
            .from(addr(1))
            .gas(90_000)
            .gas_price(25_000_000_000)
            .nonce(7)
            .chain_id(CHAIN_ID)
            .build()
            .unwrap();

        let err = tx.append_fee_payer_signatures([sig(4)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert!(err.message.contains("feePayer must be defined"));
        assert!(tx.fee_payer_signatures().is_empty());

        // Nothing to append is not an error
        tx.append_fee_payer_signatures(Vec::new()).unwrap();

        tx.set_fee_payer(addr(9)).unwrap();
        tx.append_fee_payer_signatures([sig(4)]).unwrap();
        let decoded = Transaction::from_raw_transaction(&tx.raw_transaction().unwrap()).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn test_legacy_single_signature() {
        let mut tx = sample(TxType::Legacy);
        let err = tx.append_signatures([sig(5)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(tx.signatures().len(), 1);
    }

    // === Combine ===

    #[test]
    fn test_combine_rejects_other_type() {
        let mut tx = sample(TxType::ValueTransfer);
        let other = sample(TxType::FeeDelegatedValueTransfer).raw_transaction().unwrap();

        let err = tx.combine_signatures(&[other]).unwrap_err();
        assert_eq!(err.code, ErrorCode::TypeMismatch);
        assert_eq!(
            err.message,
            "Transaction type mismatch: Signatures from different transactions cannot be combined."
        );
    }

    #[test]
    fn test_combine_is_atomic() {
        let mut tx = sample(TxType::ValueTransferMemo);
        let before = tx.clone();

        let mut peer = sample(TxType::ValueTransferMemo);
        peer.signatures.clear();
        peer.append_signatures([sig(6)]).unwrap();
        let good = peer.raw_transaction().unwrap();

        let mut stranger = peer.clone();
        stranger.gas = 1;
        let bad = stranger.raw_transaction().unwrap();

        let err = tx.combine_signatures(&[good, bad]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InconsistentTransaction);
        assert_eq!(err.message, "Transactions containing different information cannot be combined.");
        assert_eq!(tx, before);
    }

    #[test]
    fn test_combine_adopts_fee_payer() {
        let mut tx = sample(TxType::FeeDelegatedCancel);
        tx.fee_delegation = Some(FeeDelegation::default());

        let peer = sample(TxType::FeeDelegatedCancel);
        tx.combine_signatures(&[peer.raw_transaction().unwrap()]).unwrap();

        assert_eq!(tx.fee_payer(), Some(&addr(9)));
        assert_eq!(tx.signatures().len(), 2);
        assert_eq!(tx.fee_payer_signatures().len(), 1);
    }

    #[test]
    fn test_combine_rejects_different_fee_payer() {
        let mut tx = sample(TxType::FeeDelegatedCancel);
        let mut peer = tx.clone();
        peer.set_fee_payer(addr(10)).unwrap();

        let err = tx.combine_signatures(&[peer.raw_transaction().unwrap()]).unwrap_err();
        assert_eq!(err.details.as_deref(), Some("field: feePayer"));
    }

    #[test]
    fn test_combine_backfills_only_when_unsigned() {
        let peer = sample(TxType::Cancel);
        let encoded = peer.raw_transaction().unwrap();

        // Unsigned and without a nonce: the nonce is adopted
        let mut empty = peer.clone();
        empty.signatures.clear();
        empty.nonce = None;
        empty.combine_signatures(&[&encoded]).unwrap();
        assert_eq!(empty.nonce(), Some(7));

        // Already signed: a missing nonce is a conflict
        let mut signed = peer;
        signed.nonce = None;
        let err = signed.combine_signatures(&[&encoded]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InconsistentTransaction);
        assert_eq!(signed.nonce(), None);
    }

    // === JSON ===

    #[test]
    fn test_json_round_trip() {
        for tx_type in TxType::all() {
            let tx = sample(tx_type);
            let json = tx.to_json();
            assert_eq!(json["type"], tx_type.name());

            let rebuilt = Transaction::from_json(tx_type, &json).unwrap();
            assert_eq!(rebuilt, tx, "{}", tx_type);
        }
    }

    #[test]
    fn test_signature_debug_is_hex() {
        let rendered = format!("{:?}", sig(1));
        assert!(rendered.contains(&encode_hex(&[1u8; 32])));
        assert!(rendered.contains("0x7f6"));
    }
}
