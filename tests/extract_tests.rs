use smcheck::{Message, MessagePattern};

#[test]
fn text_without_messages_yields_nothing() {
    let pattern = MessagePattern::default();
    let text = ":compileJava UP-TO-DATE\nBUILD SUCCESSFUL\n##teamcity message without bracket";
    assert_eq!(pattern.extract(text).count(), 0);
    assert!(pattern.extract_all("").is_empty());
}

#[test]
fn messages_are_extracted_in_emission_order() {
    let pattern = MessagePattern::default();
    let text = "noise ##teamcity[testStarted name='a'] more \
                ##teamcity[testFinished name='a' duration='12']\n\
                ##teamcity[testStarted name='b']";
    let found = pattern.extract_all(text);
    assert_eq!(
        found,
        vec![
            Message::from("##teamcity[testStarted name='a']"),
            Message::from("##teamcity[testFinished name='a' duration='12']"),
            Message::from("##teamcity[testStarted name='b']"),
        ]
    );
}

#[test]
fn escaped_bracket_does_not_end_the_message() {
    let pattern = MessagePattern::default();
    let text = "##teamcity[message text='array|[0|] is null' status='ERROR'] trailing]";
    let found = pattern.extract_all(text);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0], "##teamcity[message text='array|[0|] is null' status='ERROR']");
}

#[test]
fn escaped_crlf_collapses_to_escaped_lf() {
    let pattern = MessagePattern::default();
    let text = "##teamcity[testFailed name='t' details='line1|r|nline2|r|n']";
    let found = pattern.extract_all(text);
    assert_eq!(found, vec![Message::from("##teamcity[testFailed name='t' details='line1|nline2|n']")]);
}

#[test]
fn unterminated_message_is_ignored() {
    let pattern = MessagePattern::default();
    let text = "##teamcity[testStarted name='a'\n##teamcity[testStarted name='b']";
    let found = pattern.extract_all(text);
    assert_eq!(found, vec![Message::from("##teamcity[testStarted name='b']")]);
}

#[test]
fn extraction_is_lazy() {
    let pattern = MessagePattern::default();
    let text = "##teamcity[a] ##teamcity[b] ##teamcity[c]";
    let mut iter = pattern.extract(text);
    assert_eq!(iter.next(), Some(Message::from("##teamcity[a]")));
    assert_eq!(iter.next(), Some(Message::from("##teamcity[b]")));
}

#[test]
fn custom_pattern_is_honoured() {
    let pattern: MessagePattern = r"##custom\[[^\]]*\]".parse().expect("pattern");
    let found = pattern.extract_all("##teamcity[skip] ##custom[keep]");
    assert_eq!(found, vec![Message::from("##custom[keep]")]);
}

#[test]
fn escaped_pipe_does_not_unescape_the_bracket() {
    let pattern = MessagePattern::default();
    let text = "##teamcity[message text='a||] tail'] after";
    assert_eq!(
        pattern.extract_all(text),
        vec![Message::from("##teamcity[message text='a||] tail']")]
    );
}

#[test]
fn look_behind_patterns_are_accepted() {
    let pattern = MessagePattern::new(r"##custom\[(.*?)(?<!\|)\]").expect("pattern");
    let found = pattern.extract_all("##custom[a|]b] ##teamcity[skip] ##custom[c]");
    assert_eq!(found, vec![Message::from("##custom[a|]b]"), Message::from("##custom[c]")]);
}
