// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

#![no_main]

use ct_log_verifier::{verify_sct, AddChainResponse, LogDescription, SignedCertificateTimestamp};
use libfuzzer_sys::fuzz_target;

// Let's Encrypt's Willow 2025h1b log key.
const LOG_KEY: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEbNmWXyYsF2pohGOAiNELea6UL4/XioI3w6ChE5Udlos0HUqM7KOHIP9qBuWCVs6VAdtDXrvanmxKq52Whh2+2w==";

fuzz_target!(|data: &[u8]| {
    let Ok(response) = serde_json::from_slice::<AddChainResponse>(data) else {
        return;
    };
    let Ok(log) = LogDescription::new("ct.example.com", LOG_KEY) else {
        return;
    };
    let sct = SignedCertificateTimestamp::from(response);
    let _ = verify_sct(&sct, data, "00", &log);
});
