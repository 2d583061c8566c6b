/// Shape of a stanza key.
///
/// Token keys look like `token.<index>.<field>`, host-token keys like
/// `host.<field>`. Anything else is a plain setting name. Field names are
/// returned unchecked; the validator decides whether they are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey<'a> {
    Token { index: usize, field: &'a str },
    Host { field: &'a str },
    Acl,
    Plain(&'a str),
}

pub const ACL_KEY: &str = "eai:acl";

pub fn classify(key: &str) -> SettingKey<'_> {
    if key == ACL_KEY {
        return SettingKey::Acl;
    }

    if let Some(rest) = key.strip_prefix("token.") {
        if let Some((index, field)) = rest.split_once('.') {
            if is_digits(index) && is_word(field) {
                if let Ok(index) = index.parse::<usize>() {
                    return SettingKey::Token { index, field };
                }
            }
        }
    } else if let Some(field) = key.strip_prefix("host.") {
        if is_word(field) {
            return SettingKey::Host { field };
        }
    }

    SettingKey::Plain(key)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
