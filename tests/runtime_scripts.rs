//! Runs compiled github-script bodies under `node` against a recording
//! stand-in for `core`, `github` and `context`. Skipped when node is absent.

use aw_compile::{CompileOptions, CompiledWorkflow, Step, compile_str};
use serde_json::{Value, json};
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const HARNESS: &str = r#"
const fs = require("fs");
const fixture = JSON.parse(fs.readFileSync(process.argv[2], "utf8"));
const script = fs.readFileSync(process.argv[3], "utf8");
const record = { calls: [], warnings: [], failed: null, error: null, outputs: {} };

const core = {
  info() {},
  warning: message => record.warnings.push(String(message)),
  setFailed: message => {
    if (record.failed === null) record.failed = String(message);
  },
  setOutput: (name, value) => {
    record.outputs[name] = String(value);
  },
  summary: { addRaw() { return this; }, async write() {} },
};

const rest = new Proxy({}, {
  get: (_, namespace) => new Proxy({}, {
    get: (_, method) => async params => {
      const name = `${namespace}.${method}`;
      record.calls.push({ name, params });
      return { data: (fixture.rest || {})[name] ?? {} };
    },
  }),
});

const github = {
  rest,
  graphql: async (query, variables) => {
    const match = (fixture.graphql || []).find(([needle]) => query.includes(needle));
    record.calls.push({ name: "graphql", params: variables, operation: match ? match[0] : null });
    return match ? match[1] : {};
  },
};

const context = {
  payload: fixture.payload || {},
  repo: { owner: "octo", repo: "app" },
  serverUrl: "https://github.com",
  runId: 42,
};

(async () => {
  const AsyncFunction = Object.getPrototypeOf(async function () {}).constructor;
  try {
    await new AsyncFunction("require", "core", "github", "context", script)(require, core, github, context);
  } catch (error) {
    record.error = error instanceof Error ? error.message : String(error);
  }
  process.stdout.write(JSON.stringify(record));
})();
"#;

fn node_available() -> bool {
    Command::new("node").arg("--version").output().map(|out| out.status.success()).unwrap_or(false)
}

macro_rules! require_node {
    () => {
        if !node_available() {
            eprintln!("node not found; skipping");
            return;
        }
    };
}

fn compile(src: &str) -> CompiledWorkflow {
    compile_str(src, &CompileOptions::default()).expect("workflow compiles")
}

fn script_step<'a>(compiled: &'a CompiledWorkflow, job: &str, step: &str) -> &'a Step {
    compiled
        .graph
        .get(job)
        .and_then(|j| j.step(step))
        .unwrap_or_else(|| panic!("{}.{} missing", job, step))
}

/// Scratch space for one script run.
struct Sandbox {
    dir: TempDir,
    fixture: Value,
    env: Vec<(String, String)>,
}

impl Sandbox {
    fn new() -> Self {
        Self { dir: TempDir::new().expect("temp dir"), fixture: json!({}), env: Vec::new() }
    }

    fn items(mut self, items: Value) -> Self {
        let path = self.dir.path().join("agent_output.json");
        fs::write(&path, json!({ "items": items }).to_string()).expect("write agent output");
        self.env.push(("GH_AW_AGENT_OUTPUT".into(), path.display().to_string()));
        self
    }

    fn file(mut self, var: &str, name: &str, content: &str) -> Self {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("write fixture file");
        self.env.push((var.into(), path.display().to_string()));
        self
    }

    fn fixture(mut self, fixture: Value) -> Self {
        self.fixture = fixture;
        self
    }

    /// Run the step's script with its literal env and the sandbox overrides.
    fn run(self, step: &Step) -> Value {
        let script = step.with.get("script").expect("step carries a script");
        let harness = self.dir.path().join("harness.cjs");
        let script_path = self.dir.path().join("script.cjs");
        let fixture_path = self.dir.path().join("fixture.json");
        fs::write(&harness, HARNESS).unwrap();
        fs::write(&script_path, script).unwrap();
        fs::write(&fixture_path, self.fixture.to_string()).unwrap();

        let mut cmd = Command::new("node");
        cmd.arg(&harness).arg(&fixture_path).arg(&script_path);
        for (name, value) in step.env.iter().filter(|(_, value)| !value.contains("${{")) {
            cmd.env(name, value);
        }
        cmd.envs(self.env);
        let out = cmd.output().expect("node runs");
        assert!(out.status.success(), "harness failed: {}", String::from_utf8_lossy(&out.stderr));
        serde_json::from_slice(&out.stdout).expect("harness prints a record")
    }
}

fn calls<'a>(record: &'a Value, name: &str) -> Vec<&'a Value> {
    record["calls"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|call| call["name"] == name)
        .collect()
}

#[test]
fn reviewers_beyond_max_are_dropped_with_one_warning() {
    require_node!();
    let compiled = compile(
        "name: Review\non: pull_request\nsafe-outputs:\n  threat-detection: false\n  add-reviewer:\n    reviewers: [alice, bob, carol]\n    max: 2\n",
    );
    let record = Sandbox::new()
        .items(json!([
            { "type": "add_reviewer", "reviewers": ["alice", "bob"] },
            { "type": "add_reviewer", "reviewers": ["carol"] }
        ]))
        .fixture(json!({ "payload": { "pull_request": { "number": 5 } } }))
        .run(script_step(&compiled, "add_reviewer", "add_reviewer"));

    assert!(record["error"].is_null(), "{}", record);
    assert_eq!(record["warnings"].as_array().unwrap().len(), 1, "{}", record["warnings"]);
    let requests = calls(&record, "pulls.requestReviewers");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["params"]["pull_number"], 5);
    assert_eq!(requests[0]["params"]["reviewers"], json!(["alice", "bob"]));
    assert_eq!(record["outputs"]["reviewers_added"], "alice\nbob");
}

#[test]
fn reviewers_within_max_raise_no_warning() {
    require_node!();
    let compiled = compile(
        "name: Review\non: pull_request\nsafe-outputs:\n  threat-detection: false\n  add-reviewer:\n    reviewers: [alice, bob]\n    max: 3\n",
    );
    let record = Sandbox::new()
        .items(json!([{ "type": "add_reviewer", "reviewers": ["alice", "bob", "alice"] }]))
        .fixture(json!({ "payload": { "pull_request": { "number": 5 } } }))
        .run(script_step(&compiled, "add_reviewer", "add_reviewer"));

    assert!(record["warnings"].as_array().unwrap().is_empty(), "{}", record["warnings"]);
    assert_eq!(calls(&record, "pulls.requestReviewers")[0]["params"]["reviewers"], json!(["alice", "bob"]));
}

#[test]
fn wildcard_reviewers_go_to_the_pull_request_each_item_names() {
    require_node!();
    let compiled = compile(
        "name: Review\non: workflow_dispatch\nsafe-outputs:\n  threat-detection: false\n  add-reviewer:\n    reviewers: [alice, bob]\n    target: \"*\"\n    max: 3\n",
    );
    let record = Sandbox::new()
        .items(json!([
            { "type": "add_reviewer", "pull_request_number": 5, "reviewers": ["alice"] },
            { "type": "add_reviewer", "pull_request_number": 9, "reviewers": ["bob"] }
        ]))
        .run(script_step(&compiled, "add_reviewer", "add_reviewer"));

    assert!(record["error"].is_null(), "{}", record);
    let requests = calls(&record, "pulls.requestReviewers");
    let applied: Vec<(Value, Value)> = requests
        .iter()
        .map(|call| (call["params"]["pull_number"].clone(), call["params"]["reviewers"].clone()))
        .collect();
    assert_eq!(applied, [(json!(5), json!(["alice"])), (json!(9), json!(["bob"]))]);
}

#[test]
fn wildcard_item_without_a_number_fails_the_step() {
    require_node!();
    let compiled = compile(
        "name: Review\non: workflow_dispatch\nsafe-outputs:\n  threat-detection: false\n  add-reviewer:\n    reviewers: [alice]\n    target: \"*\"\n",
    );
    let record = Sandbox::new()
        .items(json!([{ "type": "add_reviewer", "reviewers": ["alice"] }]))
        .run(script_step(&compiled, "add_reviewer", "add_reviewer"));

    assert!(record["error"].as_str().unwrap().contains("pull_request_number"), "{}", record);
    assert!(calls(&record, "pulls.requestReviewers").is_empty());
}

const FLAGGED: &str =
    r#"{"prompt_injection":true,"secret_leak":false,"malicious_patch":false,"reasons":["ignore previous instructions"]}"#;
const CLEAN: &str = r#"{"prompt_injection":false,"secret_leak":false,"malicious_patch":false,"reasons":[]}"#;

fn detection_parser(threat_detection: &str) -> (CompiledWorkflow, &'static str) {
    let src = format!(
        "name: Triage\non: issues\nsafe-outputs:\n  threat-detection:\n{}\n  create-issue:\n",
        threat_detection
    );
    (compile(&src), "parse_results")
}

#[test]
fn engine_flag_is_not_masked_by_a_clean_steps_verdict() {
    require_node!();
    let (compiled, step) = detection_parser("    steps:\n      - name: Scan\n        run: ./scan.sh");
    let parse = script_step(&compiled, "detection", step);
    assert_eq!(parse.env.get("GH_AW_DETECTION_MODE"), Some("ai+custom"));

    let record = Sandbox::new()
        .file("GH_AW_DETECTION_LOG", "detection.log", &format!("thinking\nTHREAT_DETECTION_RESULT:{}\n", FLAGGED))
        .file("GH_AW_DETECTION_VERDICT", "verdict.json", CLEAN)
        .run(parse);

    assert!(record["failed"].as_str().unwrap().contains("prompt_injection"), "{}", record);
    assert_eq!(record["outputs"]["success"], "false");
}

#[test]
fn steps_verdict_alone_cannot_stand_in_for_the_engine() {
    require_node!();
    let (compiled, step) = detection_parser("    prompt: Be strict");
    let record = Sandbox::new()
        .file("GH_AW_DETECTION_LOG", "detection.log", "engine crashed\n")
        .file("GH_AW_DETECTION_VERDICT", "verdict.json", CLEAN)
        .run(script_step(&compiled, "detection", step));

    assert!(record["failed"].as_str().unwrap().contains("no verdict"), "{}", record);
    assert_eq!(record["outputs"]["success"], "false");
}

#[test]
fn flagged_steps_verdict_fails_alongside_a_clean_engine() {
    require_node!();
    let (compiled, step) = detection_parser("    steps:\n      - name: Scan\n        run: ./scan.sh");
    let record = Sandbox::new()
        .file("GH_AW_DETECTION_LOG", "detection.log", &format!("THREAT_DETECTION_RESULT:{}\n", CLEAN))
        .file("GH_AW_DETECTION_VERDICT", "verdict.json", FLAGGED)
        .run(script_step(&compiled, "detection", step));

    assert!(record["failed"].as_str().unwrap().contains("Security threats detected"), "{}", record);
    assert_eq!(record["outputs"]["success"], "false");
}

#[test]
fn clean_verdicts_open_the_gate() {
    require_node!();
    let (compiled, step) = detection_parser("    engine: false\n    steps:\n      - name: Scan\n        run: ./scan.sh");
    let parse = script_step(&compiled, "detection", step);
    assert_eq!(parse.env.get("GH_AW_DETECTION_MODE"), Some("custom"));

    let record = Sandbox::new().file("GH_AW_DETECTION_VERDICT", "verdict.json", CLEAN).run(parse);

    assert!(record["failed"].is_null(), "{}", record);
    assert_eq!(record["outputs"]["success"], "true");
}

#[test]
fn malformed_verdict_fails_the_gate() {
    require_node!();
    let (compiled, step) = detection_parser("    prompt: Be strict");
    let record = Sandbox::new()
        .file("GH_AW_DETECTION_LOG", "detection.log", "THREAT_DETECTION_RESULT:{\"prompt_injection\":\"no\"}\n")
        .run(script_step(&compiled, "detection", step));

    assert!(record["failed"].as_str().unwrap().contains("boolean flags"), "{}", record);
    assert_eq!(record["outputs"]["success"], "false");
}

#[test]
fn discussion_comments_use_the_discussion_api() {
    require_node!();
    let compiled = compile(
        "name: Triage\non: discussion\nsafe-outputs:\n  threat-detection: false\n  add-comment:\n    discussion: true\n",
    );
    let record = Sandbox::new()
        .items(json!([{ "type": "add_comment", "body": "Thanks!" }]))
        .fixture(json!({
            "payload": { "discussion": { "number": 77 } },
            "graphql": [
                ["discussion(number", { "repository": { "discussion": { "id": "D_77", "url": "https://github.com/octo/app/discussions/77", "comments": { "nodes": [] } } } }],
                ["addDiscussionComment", { "addDiscussionComment": { "comment": { "id": "DC_1", "url": "https://github.com/octo/app/discussions/77#c1" } } }]
            ]
        }))
        .run(script_step(&compiled, "add_comment", "add_comment"));

    assert!(record["error"].is_null(), "{}", record);
    assert!(calls(&record, "issues.createComment").is_empty());
    let graphql = calls(&record, "graphql");
    assert_eq!(graphql[0]["params"]["number"], 77);
    assert_eq!(graphql[1]["operation"], "addDiscussionComment");
    assert_eq!(graphql[1]["params"]["id"], "D_77");
    assert!(graphql[1]["params"]["body"].as_str().unwrap().starts_with("Thanks!"));
    assert_eq!(record["outputs"]["comment_id"], "DC_1");
}

#[test]
fn older_workflow_comments_are_hidden_before_posting() {
    require_node!();
    let compiled = compile(
        "name: Triage\non: issues\nsafe-outputs:\n  threat-detection: false\n  add-comment:\n    hide-older-comments:\n",
    );
    let record = Sandbox::new()
        .items(json!([{ "type": "add_comment", "body": "Updated triage" }]))
        .fixture(json!({
            "payload": { "issue": { "number": 3 } },
            "rest": {
                "issues.listComments": [
                    { "node_id": "IC_old", "body": "Earlier triage\n\n<!-- gh-aw-workflow: Triage -->" },
                    { "node_id": "IC_human", "body": "Thanks bot" }
                ],
                "issues.createComment": { "id": 11, "html_url": "https://github.com/octo/app/issues/3#c11" }
            },
            "graphql": [["minimizeComment", { "minimizeComment": { "minimizedComment": { "isMinimized": true } } }]]
        }))
        .run(script_step(&compiled, "add_comment", "add_comment"));

    assert!(record["error"].is_null(), "{}", record);
    let hidden: Vec<&Value> = calls(&record, "graphql").iter().map(|call| &call["params"]["id"]).collect();
    assert_eq!(hidden, [&json!("IC_old")]);
    let posted = calls(&record, "issues.createComment");
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0]["params"]["issue_number"], 3);
    assert!(posted[0]["params"]["body"].as_str().unwrap().contains("<!-- gh-aw-workflow: Triage -->"));
}

#[test]
fn too_few_items_fail_the_step() {
    require_node!();
    let compiled = compile("name: Audit\non: issues\nsafe-outputs:\n  threat-detection: false\n  missing-tool:\n    min: 2\n");
    let record = Sandbox::new()
        .items(json!([{ "type": "missing_tool", "tool": "jq", "reason": "not installed" }]))
        .run(script_step(&compiled, "missing_tool", "missing_tool"));

    assert!(record["failed"].as_str().unwrap().contains("at least 2"), "{}", record);
    assert_eq!(record["outputs"]["total_count"], "0");
}

#[test]
fn links_outside_allowed_domains_are_redacted() {
    require_node!();
    let compiled = compile(
        "name: Triage\non: issues\nsafe-outputs:\n  threat-detection: false\n  allowed-domains: [example.com]\n  create-issue:\n",
    );
    let record = Sandbox::new()
        .items(json!([{
            "type": "create_issue",
            "title": "Report",
            "body": "See https://evil.test/x and https://docs.example.com/ok"
        }]))
        .fixture(json!({ "rest": { "issues.create": { "number": 12, "html_url": "https://github.com/octo/app/issues/12" } } }))
        .run(script_step(&compiled, "create_issue", "create_issue"));

    assert!(record["error"].is_null(), "{}", record);
    let body = calls(&record, "issues.create")[0]["params"]["body"].as_str().unwrap().to_string();
    assert!(body.contains("(redacted)"), "{}", body);
    assert!(!body.contains("evil.test"), "{}", body);
    assert!(body.contains("https://docs.example.com/ok"), "{}", body);
}
