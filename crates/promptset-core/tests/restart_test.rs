//! End-to-end tests over a real data directory: extraction from raw files,
//! and state that must survive a restart.

use serde_json::json;

use promptset_core::{Origin, Prompt};
use promptset_test_utils::{TestDataDir, raw_preset};

fn seeded_dir() -> TestDataDir {
    let dir = TestDataDir::new();
    dir.write_raw_preset(
        "rp",
        &raw_preset(&[("A", "alpha"), ("B", "beta"), ("C", "gamma")], Some("SYS")),
    );
    dir.write_raw_preset("assistant", &raw_preset(&[("Helper", "Be helpful.")], None));
    dir
}

#[test]
fn fresh_directory_has_no_presets_until_refresh() {
    let dir = seeded_dir();
    let mut session = dir.open_session();
    assert!(session.preset_list().is_empty());
    assert_eq!(session.current_preset_name(), "");

    let out = session.refresh_prompts();
    assert!(out.is_ok(), "{}", out.message);
    assert_eq!(out.payload.preset_count, 2);
    assert_eq!(out.payload.prompt_count, 4);
    assert_eq!(session.current_preset_name(), "assistant");
}

#[test]
fn activation_survives_restart() {
    let dir = seeded_dir();
    {
        let mut session = dir.open_session();
        session.refresh_prompts();
        assert!(session.switch_preset(1).is_ok());
        assert!(session.activate_prompts(&[2, 0]).is_ok());
        session.terminate();
    }

    let session = dir.open_session();
    assert_eq!(session.current_preset_name(), "rp");
    assert_eq!(
        session.active_prompts(),
        &[Prompt::extracted("C", "gamma"), Prompt::extracted("A", "alpha")]
    );
    let (system, _) = session.process_llm_request("", "");
    assert_eq!(system, "SYS\n\ngamma\n\nalpha");
}

#[test]
fn groups_and_user_prompts_survive_restart_and_refresh() {
    let dir = seeded_dir();
    {
        let mut session = dir.open_session();
        session.refresh_prompts();
        session.switch_preset(1);
        assert!(session.add_prompt("mine", "custom").is_ok());
        assert!(session.create_prompt_group("g1", &[0, 3]).is_ok());
    }

    let mut session = dir.open_session();
    assert_eq!(session.prompt_group("g1"), Some(&[0, 3][..]));
    assert_eq!(session.current_prompts()[3].origin, Origin::UserCreated);

    session.refresh_prompts();
    session.switch_preset(1);
    assert_eq!(session.current_prompts().len(), 4);
    assert_eq!(session.prompt_group("g1"), Some(&[0, 3][..]));
}

#[test]
fn edited_raw_prompt_drops_its_activation_on_restart() {
    let dir = seeded_dir();
    {
        let mut session = dir.open_session();
        session.refresh_prompts();
        session.switch_preset(1);
        session.activate_prompts(&[0, 1]);
    }

    dir.write_raw_preset(
        "rp",
        &raw_preset(&[("A", "alpha v2"), ("B", "beta"), ("C", "gamma")], Some("SYS")),
    );
    // Refresh clears activation only in memory; the file for `rp` still
    // holds markers for A and B.
    dir.open_session().refresh_prompts();

    let mut session = dir.open_session();
    assert_eq!(session.current_preset_name(), "assistant");
    session.switch_preset(1);
    assert_eq!(session.active_prompts(), &[Prompt::extracted("B", "beta")]);
}

#[test]
fn unparseable_raw_file_is_skipped() {
    let dir = seeded_dir();
    std::fs::write(dir.config().presets_dir().join("broken.json"), "{not json").unwrap();

    let mut session = dir.open_session();
    let out = session.refresh_prompts();
    assert!(out.is_ok());
    assert_eq!(session.preset_list(), vec!["assistant", "rp"]);
}

#[test]
fn records_use_the_documented_layout() {
    let dir = seeded_dir();
    let mut session = dir.open_session();
    session.refresh_prompts();
    session.switch_preset(1);
    session.activate_prompt(1);
    session.create_prompt_group("pair", &[0, 1]);

    assert_eq!(dir.read_state("session").unwrap(), json!({"current_preset": "rp"}));
    assert_eq!(
        dir.read_state("groups/rp").unwrap(),
        json!({"groups": {"pair": [0, 1]}})
    );
    let activation = dir.read_state("activation/rp").unwrap();
    assert_eq!(activation["active"][0]["name"], "B");
    assert_eq!(activation["active"][0]["origin"], "extracted");
    assert_eq!(activation["active"][0]["digest"].as_str().unwrap().len(), 64);
    let record = dir.read_state("extracted/rp").unwrap();
    assert_eq!(record["prefix"], "SYS");
}
