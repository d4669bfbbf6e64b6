use anyhow::Result;
use krnspec::{GenError, Mapping, Template};

fn mapping(pairs: &[(&str, &str)]) -> Mapping {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn substitutes_plain_and_braced_placeholders() -> Result<()> {
    let template = Template::new("inline", "$name(${arg}_x) costs $$5");
    let text = template.substitute(&mapping(&[("name", "f"), ("arg", "in")]))?;
    assert_eq!(text, "f(in_x) costs $5");
    Ok(())
}

#[test]
fn strict_substitution_names_the_missing_key() {
    let template = Template::new("header.txt", "#ifndef $guard\n$functions");
    let err = template
        .substitute(&mapping(&[("guard", "_H_")]))
        .unwrap_err();
    assert_eq!(
        err,
        GenError::Template {
            template: "header.txt".to_string(),
            key: "functions".to_string(),
        }
    );
    assert_eq!(err.to_string(), "template header.txt has no value for $functions");
}

#[test]
fn safe_substitution_keeps_unknown_placeholders() {
    let template = Template::new("body", "$core_name(${core_name7}); $ 5 ${unclosed");
    let text = template.safe_substitute(&mapping(&[("core_name", "avepool")]));
    assert_eq!(text, "avepool(${core_name7}); $ 5 ${unclosed");
}

#[test]
fn placeholders_are_listed_once_in_order() {
    let template = Template::new("body", "$b $a ${b} $$c $_d1");
    assert_eq!(template.placeholders(), vec!["b", "a", "_d1"]);
}
