use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    consts::store_const::MEMBER_TABLE,
    errors::{Error, Result},
    store::{Record, Row},
    utils::validator::is_email_shape,
};

/// One alumni row. Everything but the identifier, linkage and timestamps is editable.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MemberRecord {
    pub id: i64,
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub ref_no: Option<String>,
    pub tr_type: Option<String>,
    pub dep: Option<String>,
    pub f_name: Option<String>,
    pub l_name: Option<String>,
    pub gender: Option<String>,
    pub country: Option<String>,
    pub country2: Option<String>,
    pub clasification: Option<String>,
    pub r_group: Option<String>,
    pub institute: Option<String>,
    pub email_1: Option<String>,
    pub email_2: Option<String>,
    pub tr_loc: Option<String>,
    pub tr_name: Option<String>,
    pub tr_name_text: Option<String>,
    pub st: Option<String>,
    pub t1: Option<String>,
    pub t2: Option<String>,
    pub t3: Option<String>,
    pub t4: Option<String>,
    pub t5: Option<String>,
    pub t6: Option<String>,
    pub t7: Option<String>,
    pub t8: Option<String>,
    pub t9: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<String>,
    pub job_title: Option<String>,
    pub programme_name: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Record for MemberRecord {
    const TABLE: &'static str = MEMBER_TABLE;
    const NAME: &'static str = "Member record";

    fn id(&self) -> i64 {
        self.id
    }

    fn check(&self) -> Result<()> {
        for email in [&self.email_1, &self.email_2].into_iter().flatten() {
            if !email.trim().is_empty() && !is_email_shape(email.trim()) {
                return Err(Error::invalid("Please enter a valid email address."));
            }
        }
        Ok(())
    }
}

/// Columns the admin list can be searched by, first one is the default.
pub const SEARCH_FIELDS: [(&str, &str); 7] = [
    ("f_name", "First Name"),
    ("l_name", "Last Name"),
    ("email_1", "Email"),
    ("country", "Country"),
    ("ref_no", "Reference Number"),
    ("job_title", "Job Title"),
    ("programme_name", "Programme Name"),
];

pub fn search_field(requested: Option<&str>) -> Result<&'static str> {
    match requested.filter(|f| !f.is_empty()) {
        None => Ok(SEARCH_FIELDS[0].0),
        Some(field) => SEARCH_FIELDS
            .iter()
            .map(|(name, _)| *name)
            .find(|name| *name == field)
            .ok_or_else(|| Error::invalid(format!("Cannot search by `{field}`"))),
    }
}

/// The part of a member record a member may change on their own profile.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProfileChanges {
    pub f_name: Option<String>,
    pub l_name: Option<String>,
    pub gender: Option<String>,
    pub country: Option<String>,
    pub country2: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<String>,
    pub job_title: Option<String>,
    pub programme_name: Option<String>,
}

impl ProfileChanges {
    /// Only the fields present in the request; an empty birthday clears it.
    pub fn into_changes(self) -> Row {
        let mut changes = Row::new();
        let fields = [
            ("f_name", self.f_name),
            ("l_name", self.l_name),
            ("gender", self.gender),
            ("country", self.country),
            ("country2", self.country2),
            ("address", self.address),
            ("job_title", self.job_title),
            ("programme_name", self.programme_name),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                changes.insert(name.into(), Value::String(value));
            }
        }
        if let Some(birthday) = self.birthday {
            let value = if birthday.trim().is_empty() {
                Value::Null
            } else {
                Value::String(birthday)
            };
            changes.insert("birthday".into(), value);
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_field_defaults_to_first_name() {
        assert_eq!(search_field(None).unwrap(), "f_name");
        assert_eq!(search_field(Some("")).unwrap(), "f_name");
        assert_eq!(search_field(Some("ref_no")).unwrap(), "ref_no");
        assert!(search_field(Some("user_id")).is_err());
    }

    #[test]
    fn secondary_email_must_have_email_shape() {
        let mut member = MemberRecord {
            email_1: Some("ada@example.com".into()),
            ..Default::default()
        };
        assert!(member.check().is_ok());
        member.email_2 = Some("ada@example".into());
        assert!(member.check().is_err());
        member.email_2 = Some(String::new());
        assert!(member.check().is_ok());
    }

    #[test]
    fn profile_changes_only_carry_present_fields() {
        let changes = ProfileChanges {
            f_name: Some("Ada".into()),
            birthday: Some("".into()),
            ..Default::default()
        }
        .into_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes["f_name"], "Ada");
        assert!(changes["birthday"].is_null());
    }
}
