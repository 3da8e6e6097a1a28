// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use coap_uplink::codec::decode_message;

fuzz_target!(|data: &[u8]| {
    let _ = decode_message(data);
});
