use super::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
struct Seed {
    name: String,
    count: u32,
}

fn seed() -> Seed {
    Seed {
        name: "poppy".to_string(),
        count: 12,
    }
}

#[test]
fn cbor_and_json_decode_their_own_output() {
    let codecs: [&dyn ObjectCodec<Seed>; 2] = [&CborCodec::new(), &JsonCodec];

    for codec in codecs {
        let bytes = codec.encode(&seed()).expect("seed should encode");
        let decoded = codec.decode(&bytes).expect("seed should decode");

        assert_eq!(decoded, seed(), "{} codec changed the payload", codec.format());
    }
}

#[test]
fn cbor_rejects_payloads_over_the_limit() {
    let codec = CborCodec::with_limit(4);
    let bytes = ObjectCodec::<Seed>::encode(&codec, &seed()).expect("seed should encode");

    let err = ObjectCodec::<Seed>::decode(&codec, &bytes).expect_err("payload is over the limit");

    assert_eq!(err.kind(), CodecErrorKind::SizeLimitExceeded);
}

#[test]
fn garbage_payloads_fail_as_decode_errors() {
    let garbage = [0xff_u8, 0x00, 0x13, 0x37];

    let cbor = ObjectCodec::<Seed>::decode(&CborCodec::new(), &garbage).expect_err("garbage cbor");
    let json = ObjectCodec::<Seed>::decode(&JsonCodec, &garbage).expect_err("garbage json");

    assert_eq!(cbor.kind(), CodecErrorKind::Decode);
    assert_eq!(json.kind(), CodecErrorKind::Decode);
}

#[test]
fn json_payload_is_readable_text() {
    let bytes = ObjectCodec::<Seed>::encode(&JsonCodec, &seed()).expect("seed should encode");

    assert_eq!(
        String::from_utf8(bytes).expect("json is utf-8"),
        r#"{"name":"poppy","count":12}"#
    );
}
