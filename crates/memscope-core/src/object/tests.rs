use std::rc::Rc;

use super::*;
use crate::{BufferSpace, Count, ProfileBuilder, TypeDef};

fn profile() -> Rc<Profile> {
    ProfileBuilder::new("test")
        .vtypes([
            (
                "_NODE",
                TypeDef::new(0x10)
                    .field("Value", 0, "unsigned long")
                    .field("Next", 4, TypeSpec::pointer("_NODE"))
                    .field("Bits", 8, TypeSpec::bitfield(1, 4))
                    .field("Name", 0xc, TypeSpec::string(4u64)),
            ),
            (
                "_USER",
                TypeDef::new(0x20)
                    .field("NameLength", 0, "unsigned short")
                    .field("Count", 2, "unsigned short")
                    .field("Name", 4, TypeSpec::string(0x10u64))
                    .field(
                        "Kind",
                        0x14,
                        TypeSpec::enumeration(NativeType::unsigned(1), [(1, "Admin"), (2, "Guest")]),
                    )
                    .field(
                        "Flags",
                        0x18,
                        TypeSpec::flags(
                            NativeType::unsigned(4),
                            [("Locked", 0), ("Hidden", 3)],
                            [("Level", (8, 4))],
                        ),
                    )
                    .field("Items", 0x1c, TypeSpec::array(Count::member("Count"), "unsigned char")),
            ),
        ])
        .register_type_overlay(
            "_USER",
            TypeDef::patch().retype("Name", TypeSpec::string(Count::member("NameLength"))),
        )
        .build()
}

fn space(setup: impl FnOnce(&mut BufferSpace)) -> Rc<dyn AddressSpace> {
    let mut space = BufferSpace::new("test");
    setup(&mut space);
    Rc::new(space)
}

#[test]
fn member_at_field_offset() {
    let profile = profile();
    let vm = space(|s| {
        s.write_u32(0x1000, 0x41414141);
        s.write_u32(0x2000, 0xdeadbeef);
    });

    let node = profile.object("_NODE", 0x1000, &vm).unwrap();
    let value = node.m("Value").unwrap();
    assert_eq!(value.offset(), 0x1000);
    assert_eq!(value.value(), Ok(0x41414141));
    assert_eq!(value.name(), Some("Value"));
    assert_eq!(value.parent().map(|p| p.offset()), Some(0x1000));

    let name = node.m("Name").unwrap();
    assert_eq!(name.offset(), 0x100c);
}

#[test]
fn unknown_member_is_invalid() {
    let profile = profile();
    let vm = space(|s| s.write_u32(0x1000, 1));

    let node = profile.object("_NODE", 0x1000, &vm);
    let missing = node.m("Missing");
    assert!(missing.as_ref().unwrap_err().reason().contains("field not found"));

    // Invalid objects propagate through chains.
    let chained = missing.m("Value").index(3).dereference();
    assert_eq!(chained.unwrap_err(), missing.clone().unwrap_err());
    assert_eq!(missing.render(), "-");
}

#[test]
fn unknown_type_is_invalid() {
    let profile = profile();
    let vm = space(|s| s.write_u32(0x1000, 1));

    assert!(profile.object("_MISSING", 0x1000, &vm).is_err());
}

#[test]
fn pointer_round_trip() {
    let profile = profile();
    let vm = space(|s| {
        s.write_u32(0x1000, 1);
        s.write_u32(0x1004, 0x2000);
        s.write_u32(0x2000, 2);
    });

    let node = profile.object("_NODE", 0x1000, &vm).unwrap();
    let next = node.m("Next").dereference().unwrap();
    assert_eq!(next.offset(), 0x2000);
    assert_eq!(next.type_name(), "_NODE");
    assert_eq!(next.m("Value").value(), Ok(2));

    // Pointers forward member access to their target.
    assert_eq!(node.m("Next").m("Value").value(), Ok(2));

    // NULL and dangling pointers.
    let null = next.m("Next").dereference().unwrap_err();
    assert!(null.reason().starts_with("NULL pointer"));
}

#[test]
fn dangling_pointer_is_invalid() {
    let profile = profile();
    let vm = space(|s| {
        s.write_u32(0x1000, 1);
        s.write_u32(0x1004, 0x9000);
    });

    let node = profile.object("_NODE", 0x1000, &vm).unwrap();
    assert!(node.m("Next").dereference().is_err());
    assert!(node.m("Next").dereference_as("unsigned long").is_err());
}

#[test]
fn bitfield_extraction() {
    let profile = profile();
    let vm = space(|s| {
        s.write_u32(0x1000, 0);
        s.write_u32(0x1008, 0b1011010);
    });

    let node = profile.object("_NODE", 0x1000, &vm).unwrap();
    assert_eq!(node.m("Bits").value(), Ok(5));
}

#[test]
fn string_decoding() {
    let profile = profile();
    let vm = space(|s| {
        s.write(0x1000, &[5, 0, 2, 0]);
        s.write(0x1004, b"ADMIN\0\0\0junkjunk");
        s.write(0x3000, &[0, 0, 0, 0]);
    });

    let user = profile.object("_USER", 0x1000, &vm).unwrap();
    let name = user.m("Name").unwrap();
    assert_eq!(name.size(), 5);
    assert_eq!(name.string(), Ok(String::from("ADMIN")));
    assert_eq!(name.to_string(), "ADMIN");

    let empty = profile.object("_USER", 0x3000, &vm).m("Name");
    assert_eq!(empty.string(), Ok(String::new()));
    assert_eq!(empty.render(), "");
}

#[test]
fn string_truncates_at_nul() {
    let profile = profile();
    let vm = space(|s| s.write(0x100c, b"AB\0C"));

    let node = profile.object("_NODE", 0x1000, &vm).unwrap();
    assert_eq!(node.m("Name").string(), Ok(String::from("AB")));
}

#[test]
fn array_bounds() {
    let profile = profile();
    let vm = space(|s| {
        s.write(0x1000, &[0, 0, 3, 0]);
        s.write(0x101c, &[7, 8, 9, 10]);
    });

    let items = profile.object("_USER", 0x1000, &vm).m("Items").unwrap();
    assert_eq!(items.count(), Some(3));

    let values = items
        .elements()
        .map(|item| item.value())
        .collect::<Result<Vec<_>, _>>();
    assert_eq!(values, Ok(vec![7, 8, 9]));

    // Restartable.
    assert_eq!(items.elements().count(), 3);

    assert!(items.index(3).is_err());
    assert_eq!(items.index(2).value(), Ok(9));
}

#[test]
fn enumeration_and_flags() {
    let profile = profile();
    let vm = space(|s| {
        s.write(0x1000, &[0; 0x20]);
        s.write(0x1014, &[1]);
        s.write_u32(0x1018, 0x509);
        s.write(0x2000, &[0; 0x20]);
        s.write(0x2014, &[9]);
    });

    let user = profile.object("_USER", 0x1000, &vm).unwrap();
    assert_eq!(user.m("Kind").unwrap().label(), Ok(String::from("Admin")));

    let flags = user.m("Flags").unwrap();
    assert_eq!(
        flags.flag_names(),
        Ok(vec![String::from("Locked"), String::from("Hidden")])
    );
    assert_eq!(flags.mask("Level"), Ok(5));
    assert_eq!(flags.has_flag("Hidden"), Ok(true));
    assert_eq!(
        flags.mask("Missing").unwrap_err().reason(),
        "Mask Missing not known"
    );
    assert_eq!(flags.to_string(), "Locked, Hidden");

    let other = profile.object("_USER", 0x2000, &vm).m("Kind").unwrap();
    assert_eq!(other.to_string(), "Unknown choice 9");
}

#[test]
fn short_read_is_invalid() {
    let profile = profile();

    // The node's last field straddles into an unmapped page.
    let vm = space(|s| s.write(0xff8, &[0; 8]));
    let node = profile.object("_NODE", 0xff8, &vm).unwrap();

    let bits = node.m("Bits");
    assert!(bits.is_err());

    let value = node.m("Next").unwrap();
    assert_eq!(value.value(), Ok(0));

    // A native whose bytes are only partially available.
    let partial = profile
        .object("unsigned long long", 0xffc, &vm)
        .unwrap()
        .value()
        .unwrap_err();
    assert!(partial.reason().starts_with("short read at offset"));
}

#[test]
fn composite_rendering() {
    let profile = profile();
    let vm = space(|s| s.write_u32(0x1000, 1));

    let node = profile.object("_NODE", 0x1000, &vm).unwrap();
    assert_eq!(node.to_string(), "[_NODE @ 0x00001000]");
    assert_eq!(node.m("Value").render(), "1");
    assert!(node.is_valid());
}

#[test]
fn unsupported_native_widths_are_invalid() {
    let profile = ProfileBuilder::new("widths")
        .native("wide", NativeType::unsigned(16))
        .native("empty", NativeType::signed(0))
        .native("odd", NativeType::unsigned(3))
        .build();
    let vm = space(|s| s.write(0x1000, &[0x11; 0x10]));

    assert!(profile.object("wide", 0x1000, &vm).value().is_err());
    assert!(profile.object("empty", 0x1000, &vm).value().is_err());
    assert_eq!(profile.object("odd", 0x1000, &vm).value(), Ok(0x111111));
}

#[test]
fn cast_reinterprets_location() {
    let profile = profile();
    let vm = space(|s| {
        s.write_u32(0x1000, 0x2000);
        s.write(0x2000, &[0x03, 0x00, 0x02, 0x00, b'a', b'b', b'c', 0]);
    });

    let node = profile.object("_NODE", 0x1000, &vm).unwrap();
    assert_eq!(node.m("Value").value(), Ok(0x2000));

    let user = node.m("Value").unwrap().cast("_USER").unwrap();
    assert_eq!(user.type_name(), "_USER");
    assert_eq!(user.offset(), 0x1000);

    let target = node.m("Value").unwrap().cast(TypeSpec::pointer("_USER"));
    assert_eq!(target.dereference().m("Name").string(), Ok(String::from("abc")));

    assert!(node.cast("_MISSING").is_err());
}

#[test]
fn known_types() {
    let profile = profile();

    assert!(profile.has_type("void"));
    assert!(profile.has_type("unsigned long"));
    assert!(profile.has_type("_USER"));
    assert!(!profile.has_type("_MISSING"));
}
