// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::test_helper::fix::{get_fix, get_fix_as_json};

#[test]
pub fn deserialize_fix_from_json() {
    let fix = common::position::Fix::from_json(get_fix_as_json())
        .unwrap_or_else(|e| panic!("Failed to deserialize the raw json. Reason: {e}"));
    assert_eq!(fix, get_fix());
}

#[test]
pub fn fix_without_accuracy_omits_the_field() {
    let fix = common::test_helper::fix::get_fix_from("network");
    let json = serde_json::to_string(&fix).unwrap();
    assert!(!json.contains("accuracy"));
    assert_eq!(fix.accuracy(), None);
    assert_eq!(fix.to_position().latitude, 52.025833);
}

#[test]
pub fn deserialize_bare_position() {
    let pos = common::position::Position::from_json(r#"{ "latitude": 1.5, "longitude": -2.0 }"#)
        .unwrap_or_else(|e| panic!("Failed to deserialize the raw json. Reason: {e}"));
    assert_eq!(pos, common::position::Position::new(&1.5, &-2.0));
}
