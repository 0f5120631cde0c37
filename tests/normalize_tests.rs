use std::path::Path;

use smcheck::{Message, NormalizationRule, Normalizer, default_rules};

fn normalizer() -> Normalizer {
    Normalizer::with_default_rules(Some(Path::new("/builds/agent/work/1a2b"))).expect("rules")
}

fn samples() -> Vec<Message> {
    [
        "##teamcity[testStarted name='should add' flowId='4711']",
        "##teamcity[testFinished name='should add' duration='35' flowId='4711']",
        "##teamcity[compilationStarted compiler=':compileJava UP-TO-DATE']",
        "##teamcity[blockOpened name=':test UP-TO-DATE' timestamp='2010-09-20T12:00:00.000+0400']",
        "##teamcity[testFailed name='t' details='java.lang.AssertionError: expected:<1>|n\tat Foo.t(Foo.java:3)|n']",
        "##teamcity[message text='C:\\builds\\agent\\work\\1a2b\\src\\Foo.java']",
        "##teamcity[message text='/builds/agent/work/1a2b/src/Foo.java']",
        "##teamcity[message text='plain']",
    ]
    .into_iter()
    .map(Message::from)
    .collect()
}

#[test]
fn volatile_fields_are_replaced() {
    let n = normalizer();
    let out = n.normalize_all(&samples());

    assert_eq!(out[0], "##teamcity[testStarted name='should add' flowId='##Flow_ID##']");
    assert_eq!(
        out[1],
        "##teamcity[testFinished name='should add' duration='##Duration##' flowId='##Flow_ID##']"
    );
    assert_eq!(out[2], "##teamcity[compilationStarted compiler=':compileJava']");
    assert_eq!(out[3], "##teamcity[blockOpened name=':test' timestamp='##Timestamp##']");
    assert_eq!(out[4], "##teamcity[testFailed name='t' details='##Assert_Stacktrace##']");
    assert_eq!(out[5], "##teamcity[message text='C:##Checkout_directory##/src/Foo.java']");
    assert_eq!(out[6], "##teamcity[message text='##Checkout_directory##/src/Foo.java']");
    assert_eq!(out[7], "##teamcity[message text='plain']");
}

#[test]
fn normalization_is_idempotent() {
    let n = normalizer();
    for message in samples() {
        let once = n.normalize(&message);
        let twice = n.normalize(&once);
        assert_eq!(once, twice, "not idempotent for {message}");
    }
}

#[test]
fn input_is_left_untouched() {
    let n = normalizer();
    let message = Message::from("##teamcity[testStarted flowId='1']");
    let _ = n.normalize(&message);
    assert_eq!(message, "##teamcity[testStarted flowId='1']");
}

#[test]
fn separator_rule_runs_before_checkout_rule() {
    let rules = default_rules(Some(Path::new("/co"))).expect("rules");
    let separator = rules
        .iter()
        .position(|r| r.replacement() == "/")
        .expect("separator rule");
    let checkout = rules
        .iter()
        .position(|r| r.replacement() == "##Checkout_directory##")
        .expect("checkout rule");
    assert!(separator < checkout);
    assert_eq!(checkout, rules.len() - 1);
}

#[test]
fn checkout_rule_is_skipped_without_directory() {
    let with = default_rules(Some(Path::new("/co"))).expect("rules");
    let without = default_rules(None).expect("rules");
    let empty = default_rules(Some(Path::new(""))).expect("rules");
    assert_eq!(with.len(), without.len() + 1);
    assert_eq!(without.len(), empty.len());
}

#[test]
fn checkout_path_is_matched_literally() {
    let n = Normalizer::with_default_rules(Some(Path::new("/tmp/a.b+c"))).expect("rules");
    let out = n.normalize(&Message::from("##teamcity[message text='/tmp/a.b+c/x /tmp/aXb+c/y']"));
    assert_eq!(out, "##teamcity[message text='##Checkout_directory##/x /tmp/aXb+c/y']");
}

#[test]
fn rule_order_changes_the_result() {
    let a = NormalizationRule::new("x", "y").expect("rule");
    let b = NormalizationRule::new("y", "z").expect("rule");
    let forward = Normalizer::new(vec![a.clone(), b.clone()]);
    let backward = Normalizer::new(vec![b, a]);
    let message = Message::from("x");
    assert_eq!(forward.normalize(&message), "z");
    assert_eq!(backward.normalize(&message), "y");
}

#[test]
fn literal_rule_keeps_dollar_signs() {
    let rule = NormalizationRule::literal("a.b", "$1 cost").expect("rule");
    assert_eq!(rule.apply("a.b and axb"), "$1 cost and axb");
}

#[test]
fn empty_rule_list_is_identity() {
    let n = Normalizer::default();
    let message = Message::from("##teamcity[testStarted flowId='1']");
    assert_eq!(n.normalize(&message), message);
}

#[test]
fn repeated_up_to_date_marks_are_stripped_in_one_pass() {
    let n = normalizer();
    let message = Message::from("##teamcity[blockClosed name=':test UP-TO-DATE UP-TO-DATE']");
    let once = n.normalize(&message);
    assert_eq!(once, "##teamcity[blockClosed name=':test']");
    assert_eq!(n.normalize(&once), once);
}
