#![no_main]

use libfuzzer_sys::fuzz_target;
use objstream::{BinaryReader, Config, TypeDescr, read_object};
use objstream::descr::{ClassDescr, ChoiceDescr, EnumDescr};

fn descr() -> TypeDescr {
    ClassDescr::new("Fuzz")
        .member("flag", TypeDescr::boolean())
        .member("num", TypeDescr::integer())
        .member("ratio", TypeDescr::real())
        .member("label", TypeDescr::visible_string())
        .member("blob", TypeDescr::octet_string())
        .member("mask", TypeDescr::bit_string())
        .member("mode", TypeDescr::enumerated(
            EnumDescr::new([("off", 0), ("on", 1)], false)
        ))
        .member("items", TypeDescr::sequence_of(TypeDescr::unsigned()))
        .member("pick", ChoiceDescr::new("Pick")
            .variant("num", TypeDescr::integer())
            .variant("name", TypeDescr::utf8_string())
            .into()
        )
        .optional_member("note", TypeDescr::string_store())
        .into()
}

fuzz_target!(|data: &[u8]| {
    let descr = descr();
    let _ = read_object(
        &mut BinaryReader::new(data, Config::default()), &descr
    );
    let _ = read_object(
        &mut BinaryReader::new(
            data, Config { skip_unknown: true, ..Default::default() }
        ),
        &descr
    );
});
