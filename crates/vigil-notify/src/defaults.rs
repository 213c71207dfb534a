//! Built-in hard defaults for every supported protocol.

use std::collections::BTreeMap;
use std::sync::Arc;

use vigil_core::FieldMap;

use crate::config::NotifierDefaults;

fn common_options() -> FieldMap {
    FieldMap::from([
        (
            "message",
            "{{ service_name | default(service_id) }} - {{ version }} released",
        ),
        ("max_tries", "3"),
        ("delay", "0s"),
    ])
}

fn entry(kind: &str, url_fields: FieldMap, params: FieldMap) -> (String, Arc<NotifierDefaults>) {
    (
        kind.to_string(),
        Arc::new(NotifierDefaults::new(
            "",
            common_options(),
            url_fields,
            params,
        )),
    )
}

/// The hard-default level for each supported protocol kind.
pub fn hard_defaults() -> BTreeMap<String, Arc<NotifierDefaults>> {
    let mut map = BTreeMap::from([
        entry(
            "bark",
            FieldMap::from([("port", "443")]),
            FieldMap::from([("title", "Vigil")]),
        ),
        entry(
            "discord",
            FieldMap::new(),
            FieldMap::from([("splitlines", "yes"), ("username", "Vigil")]),
        ),
        entry("smtp", FieldMap::new(), FieldMap::new()),
        entry("googlechat", FieldMap::new(), FieldMap::new()),
        entry(
            "gotify",
            FieldMap::from([("port", "443")]),
            FieldMap::from([("disabletls", "no"), ("priority", "0"), ("title", "Vigil")]),
        ),
        entry(
            "ifttt",
            FieldMap::new(),
            FieldMap::from([("usemessageasvalue", "2"), ("usetitleasvalue", "0")]),
        ),
        entry("join", FieldMap::new(), FieldMap::new()),
        entry(
            "matrix",
            FieldMap::from([("port", "443")]),
            FieldMap::from([("disabletls", "no")]),
        ),
        entry(
            "ntfy",
            FieldMap::from([("host", "ntfy.sh")]),
            FieldMap::from([("title", "Vigil")]),
        ),
        entry("opsgenie", FieldMap::new(), FieldMap::new()),
        entry(
            "pushbullet",
            FieldMap::new(),
            FieldMap::from([("title", "Vigil")]),
        ),
        entry("pushover", FieldMap::new(), FieldMap::new()),
        entry("rocketchat", FieldMap::from([("port", "443")]), FieldMap::new()),
        entry(
            "slack",
            FieldMap::new(),
            FieldMap::from([("botname", "Vigil")]),
        ),
        entry("teams", FieldMap::new(), FieldMap::new()),
        entry(
            "telegram",
            FieldMap::new(),
            FieldMap::from([("notification", "yes"), ("preview", "yes")]),
        ),
        entry("zulip", FieldMap::new(), FieldMap::new()),
        entry(
            "generic",
            FieldMap::new(),
            FieldMap::from([
                ("contenttype", "application/json"),
                ("disabletls", "no"),
                ("messagekey", "message"),
                ("requestmethod", "POST"),
                ("titlekey", "title"),
            ]),
        ),
        entry("raw", FieldMap::new(), FieldMap::new()),
    ]);

    // Mattermost wants a richer message with the changelog link inline.
    map.insert(
        "mattermost".to_string(),
        Arc::new(NotifierDefaults::new(
            "",
            FieldMap::from([
                (
                    "message",
                    "<{{ service_url }}|{{ service_name | default(service_id) }}> \
                     - {{ version }} released\
                     {% if web_url %} (<{{ web_url }}|changelog>){% endif %}",
                ),
                ("max_tries", "3"),
                ("delay", "0s"),
            ]),
            FieldMap::from([("username", "Vigil"), ("port", "443")]),
            FieldMap::new(),
        )),
    );

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::supported_kinds;

    #[test]
    fn every_supported_kind_has_hard_defaults() {
        let defaults = hard_defaults();
        for kind in supported_kinds() {
            assert!(defaults.contains_key(kind), "missing defaults for {kind}");
        }
    }

    #[test]
    fn common_options_present() {
        let defaults = hard_defaults();
        let slack = &defaults["slack"];
        assert_eq!(slack.options.get("max_tries"), "3");
        assert_eq!(slack.options.get("delay"), "0s");
        assert!(slack.options.get("message").contains("{{ version }}"));
    }
}
