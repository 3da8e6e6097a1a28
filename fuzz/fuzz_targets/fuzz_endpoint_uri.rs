// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use coap_uplink::{encode_request, EndpointUri, RequestOptions};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(uri) = EndpointUri::parse(text) else {
        return;
    };

    // Any parsed endpoint must encode or fail cleanly, never overrun
    let mut buf = [0u8; 128];
    if let Ok(len) = encode_request(&uri, b"{}", &mut buf, &RequestOptions::default()) {
        assert!(len <= buf.len());
    }
});
