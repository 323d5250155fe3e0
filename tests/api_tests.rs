// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// tests/api_tests.rs - Include all API test modules

mod api {
    mod test_local_endpoints;
    mod test_provider_endpoints;
    mod test_routes;
    mod test_vendor_adapters;
}
