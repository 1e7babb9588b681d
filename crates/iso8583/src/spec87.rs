//! Built-in ISO 8583:1987 layout with ASCII payloads and a hex bitmap.

use std::sync::{Arc, LazyLock};

use crate::{
    encoding, padding, prefix,
    spec::{FieldSpec, MessageSpec, Spec},
};

#[derive(Clone, Copy)]
enum Layout {
    /// Fixed digits kept as sent: codes, dates and times.
    Digits,
    /// Fixed numeric quantity, zero-filled on the left.
    Numeric,
    /// Fixed alphanumeric, space-filled on the right.
    Alpha,
    /// Fixed raw bytes.
    Binary,
    Llvar,
    Lllvar,
}

use Layout::*;

#[rustfmt::skip]
const FIELDS: &[(u16, Layout, usize, &str)] = &[
    (0, Digits, 4, "Message Type Indicator"),
    (2, Llvar, 19, "Primary Account Number"),
    (3, Digits, 6, "Processing Code"),
    (4, Numeric, 12, "Transaction Amount"),
    (5, Numeric, 12, "Settlement Amount"),
    (6, Numeric, 12, "Billing Amount"),
    (7, Digits, 10, "Transmission Date & Time"),
    (8, Numeric, 8, "Billing Fee Amount"),
    (9, Numeric, 8, "Settlement Conversion Rate"),
    (10, Numeric, 8, "Cardholder Billing Conversion Rate"),
    (11, Digits, 6, "Systems Trace Audit Number (STAN)"),
    (12, Digits, 6, "Local Transaction Time"),
    (13, Digits, 4, "Local Transaction Date"),
    (14, Digits, 4, "Expiration Date"),
    (15, Digits, 4, "Settlement Date"),
    (16, Digits, 4, "Currency Conversion Date"),
    (17, Digits, 4, "Capture Date"),
    (18, Digits, 4, "Merchant Type"),
    (19, Digits, 3, "Acquiring Institution Country Code"),
    (20, Digits, 3, "PAN Extended Country Code"),
    (21, Digits, 3, "Forwarding Institution Country Code"),
    (22, Digits, 3, "Point of Sale (POS) Entry Mode"),
    (23, Digits, 3, "Card Sequence Number (CSN)"),
    (24, Digits, 3, "Function Code"),
    (25, Digits, 2, "Point of Service Condition Code"),
    (26, Digits, 2, "Point of Service PIN Capture Code"),
    (27, Numeric, 1, "Authorizing Identification Response Length"),
    (28, Alpha, 9, "Transaction Fee Amount"),
    (29, Alpha, 9, "Settlement Fee Amount"),
    (30, Alpha, 9, "Transaction Processing Fee Amount"),
    (31, Alpha, 9, "Settlement Processing Fee Amount"),
    (32, Llvar, 11, "Acquiring Institution Identification Code"),
    (33, Llvar, 11, "Forwarding Institution Identification Code"),
    (34, Llvar, 28, "Extended Primary Account Number"),
    (35, Llvar, 37, "Track 2 Data"),
    (36, Lllvar, 104, "Track 3 Data"),
    (37, Alpha, 12, "Retrieval Reference Number"),
    (38, Alpha, 6, "Authorization Identification Response"),
    (39, Alpha, 2, "Response Code"),
    (40, Alpha, 3, "Service Restriction Code"),
    (41, Alpha, 8, "Card Acceptor Terminal Identification"),
    (42, Alpha, 15, "Card Acceptor Identification Code"),
    (43, Alpha, 40, "Card Acceptor Name/Location"),
    (44, Llvar, 25, "Additional Response Data"),
    (45, Llvar, 76, "Track 1 Data"),
    (46, Lllvar, 999, "Additional Data - ISO"),
    (47, Lllvar, 999, "Additional Data - National"),
    (48, Lllvar, 999, "Additional Data - Private"),
    (49, Alpha, 3, "Transaction Currency Code"),
    (50, Alpha, 3, "Settlement Currency Code"),
    (51, Alpha, 3, "Cardholder Billing Currency Code"),
    (52, Binary, 8, "PIN Data"),
    (53, Digits, 16, "Security Related Control Information"),
    (54, Lllvar, 120, "Additional Amounts"),
    (55, Lllvar, 999, "ICC Data - EMV Having Multiple Tags"),
    (56, Lllvar, 999, "Reserved (ISO)"),
    (57, Lllvar, 999, "Reserved (National)"),
    (58, Lllvar, 999, "Reserved (National)"),
    (59, Lllvar, 999, "Reserved (National)"),
    (60, Lllvar, 999, "Reserved (National)"),
    (61, Lllvar, 999, "Reserved (Private)"),
    (62, Lllvar, 999, "Reserved (Private)"),
    (63, Lllvar, 999, "Reserved (Private)"),
    (64, Binary, 8, "Message Authentication Code (MAC)"),
    (65, Binary, 1, "Extended Bitmap Indicator"),
    (66, Digits, 1, "Settlement Code"),
    (67, Digits, 2, "Extended Payment Code"),
    (68, Digits, 3, "Receiving Institution Country Code"),
    (69, Digits, 3, "Settlement Institution Country Code"),
    (70, Digits, 3, "Network Management Information Code"),
    (71, Digits, 4, "Message Number"),
    (72, Digits, 4, "Last Message Number"),
    (73, Digits, 6, "Action Date"),
    (74, Numeric, 10, "Number of Credits"),
    (75, Numeric, 10, "Credits Reversal Number"),
    (76, Numeric, 10, "Number of Debits"),
    (77, Numeric, 10, "Debits Reversal Number"),
    (78, Numeric, 10, "Transfer Number"),
    (79, Numeric, 10, "Transfer Reversal Number"),
    (80, Numeric, 10, "Number of Inquiries"),
    (81, Numeric, 10, "Number of Authorizations"),
    (82, Numeric, 12, "Credits, Processing Fee Amount"),
    (83, Numeric, 12, "Credits, Transaction Fee Amount"),
    (84, Numeric, 12, "Debits, Processing Fee Amount"),
    (85, Numeric, 12, "Debits, Transaction Fee Amount"),
    (86, Numeric, 16, "Total Amount of Credits"),
    (87, Numeric, 16, "Credits, Reversal Amount"),
    (88, Numeric, 16, "Total Amount of Debits"),
    (89, Numeric, 16, "Debits, Reversal Amount"),
    (90, Digits, 42, "Original Data Elements"),
    (91, Alpha, 1, "File Update Code"),
    (92, Alpha, 2, "File Security Code"),
    (93, Alpha, 5, "Response Indicator"),
    (94, Alpha, 7, "Service Indicator"),
    (95, Alpha, 42, "Replacement Amounts"),
    (96, Binary, 8, "Message Security Code"),
    (97, Alpha, 17, "Net Settlement Amount"),
    (98, Alpha, 25, "Payee"),
    (99, Llvar, 11, "Settlement Institution Identification Code"),
    (100, Llvar, 11, "Receiving Institution Identification Code"),
    (101, Llvar, 17, "File Name"),
    (102, Llvar, 28, "Account Identification 1"),
    (103, Llvar, 28, "Account Identification 2"),
    (104, Lllvar, 100, "Transaction Description"),
    (105, Lllvar, 999, "Reserved for ISO Use"),
    (106, Lllvar, 999, "Reserved for ISO Use"),
    (107, Lllvar, 999, "Reserved for ISO Use"),
    (108, Lllvar, 999, "Reserved for ISO Use"),
    (109, Lllvar, 999, "Reserved for ISO Use"),
    (110, Lllvar, 999, "Reserved for ISO Use"),
    (111, Lllvar, 999, "Reserved for ISO Use"),
    (112, Lllvar, 999, "Reserved for National Use"),
    (113, Lllvar, 999, "Reserved for National Use"),
    (114, Lllvar, 999, "Reserved for National Use"),
    (115, Lllvar, 999, "Reserved for National Use"),
    (116, Lllvar, 999, "Reserved for National Use"),
    (117, Lllvar, 999, "Reserved for National Use"),
    (118, Lllvar, 999, "Reserved for National Use"),
    (119, Lllvar, 999, "Reserved for National Use"),
    (120, Lllvar, 999, "Reserved for Private Use"),
    (121, Lllvar, 999, "Reserved for Private Use"),
    (122, Lllvar, 999, "Reserved for Private Use"),
    (123, Lllvar, 999, "Reserved for Private Use"),
    (124, Lllvar, 999, "Reserved for Private Use"),
    (125, Lllvar, 999, "Reserved for Private Use"),
    (126, Lllvar, 999, "Reserved for Private Use"),
    (127, Lllvar, 999, "Reserved for Private Use"),
    (128, Binary, 8, "Message Authentication Code"),
];

static ISO87_ASCII: LazyLock<Arc<MessageSpec>> = LazyLock::new(|| {
    let mut spec = MessageSpec::new();

    let mut bitmap = Spec::new(16, encoding::Hex);
    bitmap.set_description("Bitmap");
    spec.set_field(1, FieldSpec::bitmap(bitmap));

    for &(number, layout, length, description) in FIELDS {
        spec.set_field(number, field(layout, length, description));
    }
    Arc::new(spec)
});

fn field(layout: Layout, length: usize, description: &str) -> FieldSpec {
    match layout {
        Digits => {
            let mut spec = Spec::new(length, encoding::Ascii);
            spec.set_description(description);
            FieldSpec::fixed(spec)
        }
        Numeric => {
            let mut spec = Spec::new(length, encoding::Ascii);
            spec.set_description(description).set_padding(padding::Left(b'0'));
            FieldSpec::fixed(spec)
        }
        Alpha => {
            let mut spec = Spec::new(length, encoding::Ascii);
            spec.set_description(description).set_padding(padding::Right(b' '));
            FieldSpec::fixed(spec)
        }
        Binary => {
            let mut spec = Spec::new(length, encoding::Binary);
            spec.set_description(description);
            FieldSpec::fixed(spec)
        }
        Llvar => variable(length, description, prefix::Ascii::LL),
        Lllvar => variable(length, description, prefix::Ascii::LLL),
    }
}

fn variable(length: usize, description: &str, prefix: prefix::Ascii) -> FieldSpec {
    let mut spec = Spec::new(length, encoding::Ascii);
    spec.set_description(description).set_prefix(prefix);
    FieldSpec::variable(spec)
}

/// ISO 8583:1987 fields 0..=128: ASCII payloads, ASCII length prefixes and a
/// 16-character hex bitmap (32 with the secondary bitmap).
///
/// The spec is built once and shared.
pub fn iso87_ascii() -> Arc<MessageSpec> {
    Arc::clone(&ISO87_ASCII)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::spec::{FieldKind, MAX_FIELD};

    #[test]
    fn test_defines_every_field() {
        let spec = iso87_ascii();
        for number in 0..=MAX_FIELD {
            assert!(spec.field(number).is_some(), "field {number} missing");
        }
        assert_eq!(spec.field(1).unwrap().kind, FieldKind::Bitmap);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_is_shared() {
        assert!(Arc::ptr_eq(&iso87_ascii(), &iso87_ascii()));
    }

    #[test]
    fn test_authorization_request() {
        let mut message = Message::new(iso87_ascii()).unwrap();
        message.set_mti("0100").unwrap();
        message.set_string(2, "4242424242424242").unwrap();
        message.set_string(3, "000000").unwrap();
        message.set_string(4, "1000").unwrap();
        message.set_string(11, "000007").unwrap();
        message.set_string(41, "TERM01").unwrap();

        let packed = message.pack().unwrap();
        let mut expected = b"0100".to_vec();
        expected.extend_from_slice(b"7020000000800000");
        expected.extend_from_slice(b"164242424242424242");
        expected.extend_from_slice(b"000000");
        expected.extend_from_slice(b"000000001000");
        expected.extend_from_slice(b"000007");
        expected.extend_from_slice(b"TERM01  ");
        assert_eq!(packed, expected);

        let mut read = Message::new(iso87_ascii()).unwrap();
        read.unpack(&packed).unwrap();
        assert_eq!(read.mti().unwrap().as_deref(), Some("0100"));
        assert_eq!(read.get_string(3).unwrap().as_deref(), Some("000000"));
        assert_eq!(read.get_string(11).unwrap().as_deref(), Some("000007"));
        assert_eq!(read.get_string(41).unwrap().as_deref(), Some("TERM01"));
        assert_eq!(read.get_string(4).unwrap().as_deref(), Some("1000"));
    }

    #[test]
    fn test_zero_values_survive() {
        let mut message = Message::new(iso87_ascii()).unwrap();
        message.set_mti("0200").unwrap();
        message.set_string(3, "000000").unwrap();
        message.set_string(4, "0").unwrap();

        let packed = message.pack().unwrap();
        let mut read = Message::new(iso87_ascii()).unwrap();
        read.unpack(&packed).unwrap();

        assert_eq!(read.values().unwrap(), message.values().unwrap());
        assert_eq!(read.get_string(4).unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn test_secondary_bitmap_is_hex() {
        let mut message = Message::new(iso87_ascii()).unwrap();
        message.set_mti("0800").unwrap();
        message.set_string(70, "301").unwrap();

        let packed = message.pack().unwrap();
        assert_eq!(&packed[4..36], b"80000000000000000400000000000000");
        assert_eq!(&packed[36..], b"301");
    }
}
