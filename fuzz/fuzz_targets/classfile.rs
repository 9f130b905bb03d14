#![no_main]

use hugeenum::{classfile::instruction::decode_instructions, ClassFile};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(class) = ClassFile::parse(data) {
        for method in &class.methods {
            if let Ok(code) = class.code(method) {
                let _ = decode_instructions(&code.code);
            }
        }
        let _ = class.bootstrap_methods();
        let _ = class.inner_classes();
    }
});
