//! Bengali user-facing text: labels for the closed vocabularies, validation
//! messages, and audit log message builders.

use crate::model::{ActivityKind, Audience, MatchCategory, MatchStatus};

pub const DEFAULT_VIEWER_NAME: &str = "নতুন ব্যবহারকারী";
pub const DEFAULT_AVATAR: &str = "https://cdn-icons-png.flaticon.com/512/3135/3135715.png";

pub const NOT_ADMIN: &str = "আপনার এডমিন এক্সেস নেই।";
pub const PREMIUM_REQUIRED: &str = "এই ম্যাচটি শুধুমাত্র প্রিমিয়াম সদস্যদের জন্য";
pub const LOGIN_REQUIRED: &str = "অনুগ্রহ করে লগইন করুন";
pub const BAD_CREDENTIALS: &str = "ভুল ইমেইল বা পাসওয়ার্ড";
pub const CONFIRM_REQUIRED: &str = "নিশ্চিত করতে confirm=true পাঠান";

// Validation

pub const TITLE_REQUIRED: &str = "ম্যাচের টাইটেল দিন";
pub const THUMBNAIL_REQUIRED: &str = "থাম্বনেইল URL দিন";
pub const VIDEO_URL_REQUIRED: &str = "ভিডিও URL দিন";
pub const INVALID_URL: &str = "সঠিক URL লিখুন";
pub const INVALID_XP_AMOUNT: &str = "সঠিক XP পরিমাণ দিন";
pub const BROADCAST_FIELDS_REQUIRED: &str = "শিরোনাম এবং বার্তা লিখুন";
pub const MESSAGE_TOO_LONG: &str = "বার্তা ৫০০ অক্ষরের কম হতে হবে";
pub const MESSAGE_REQUIRED: &str = "বার্তা লিখুন";
pub const INVALID_EMAIL: &str = "সঠিক ইমেইল দিন";
pub const CREDENTIALS_REQUIRED: &str = "ইমেইল এবং পাসওয়ার্ড দিন";
pub const INVALID_VIEWER_ID: &str = "অবৈধ ব্যবহারকারী আইডি";
pub const INVALID_PRICE: &str = "সঠিক প্রিমিয়াম মূল্য দিন";
pub const INVALID_DEFAULT_XP: &str = "সঠিক ডিফল্ট XP দিন";
pub const PASSWORD_TOO_SHORT: &str = "পাসওয়ার্ড কমপক্ষে ৮ অক্ষরের হতে হবে";

pub const fn category_label(c: MatchCategory) -> &'static str {
    match c {
        MatchCategory::Football => "ফুটবল",
        MatchCategory::Cricket => "ক্রিকেট",
        MatchCategory::Basketball => "বাস্কেটবল",
        MatchCategory::Tennis => "টেনিস",
        MatchCategory::Other => "অন্যান্য",
    }
}

pub const fn status_label(s: MatchStatus) -> &'static str {
    match s {
        MatchStatus::Active => "সক্রিয়",
        MatchStatus::Inactive => "নিষ্ক্রিয়",
        MatchStatus::Upcoming => "আসন্ন",
    }
}

pub const fn audience_label(a: Audience) -> &'static str {
    match a {
        Audience::All => "সকল",
        Audience::Premium => "প্রিমিয়াম",
        Audience::Free => "ফ্রি",
        Audience::Active => "সক্রিয়",
    }
}

pub const fn activity_label(k: ActivityKind) -> &'static str {
    match k {
        ActivityKind::Login => "লগইন",
        ActivityKind::Logout => "লগআউট",
        ActivityKind::MatchAdd => "ম্যাচ যোগ",
        ActivityKind::MatchEdit => "ম্যাচ এডিট",
        ActivityKind::MatchDelete => "ম্যাচ ডিলিট",
        ActivityKind::UserEdit => "ব্যবহারকারী এডিট",
        ActivityKind::UserDelete => "ব্যবহারকারী ডিলিট",
        ActivityKind::Broadcast => "ব্রডকাস্ট",
        ActivityKind::Settings => "সেটিংস",
        ActivityKind::XpAdd => "XP যোগ",
        ActivityKind::XpRemove => "XP কমানো",
    }
}

/// Audit log messages, one per admin mutation.
pub mod activity {
    pub fn login(email: &str) -> String {
        format!("{email} এডমিন হিসাবে লগইন করেছেন")
    }

    pub fn logout(email: &str) -> String {
        format!("{email} লগআউট করেছেন")
    }

    pub fn match_added(title: &str) -> String {
        format!("নতুন ম্যাচ যোগ করেছেন: {title}")
    }

    pub fn match_updated(title: &str) -> String {
        format!("ম্যাচ আপডেট করেছেন: {title}")
    }

    pub fn match_deleted(title: &str) -> String {
        format!("ম্যাচ ডিলিট করেছেন: {title}")
    }

    pub fn xp_added(amount: i64, user_id: &str) -> String {
        format!("ব্যবহারকারীকে {amount} XP যোগ করেছেন: {user_id}")
    }

    pub fn xp_removed(amount: i64, user_id: &str) -> String {
        format!("ব্যবহারকারীর থেকে {amount} XP কমানো হয়েছে: {user_id}")
    }

    pub fn premium_toggled(premium: bool, user_id: &str) -> String {
        let action = if premium { "প্রিমিয়াম" } else { "ফ্রি" };
        format!("ব্যবহারকারীর প্রিমিয়াম স্ট্যাটাস {action} করেছেন: {user_id}")
    }

    pub fn user_edited(user_id: &str) -> String {
        format!("ব্যবহারকারীর তথ্য এডিট করেছেন: {user_id}")
    }

    pub fn user_deleted(name: &str) -> String {
        format!("ব্যবহারকারী ডিলিট করেছেন: {name}")
    }

    pub fn broadcast_sent(title: &str) -> String {
        format!("ব্রডকাস্ট পাঠিয়েছেন: {title}")
    }

    pub fn admin_created(email: &str) -> String {
        format!("নতুন এডমিন যোগ করেছেন: {email}")
    }

    pub const SETTINGS_UPDATED: &str = "সিস্টেম সেটিংস আপডেট করেছেন";
    pub const LOGS_CLEARED: &str = "পুরনো লগস পরিষ্কার করেছেন";
}
