//! Captured gateway streams
//!
//! Serialized frames as the server would send them, used to replay whole
//! session histories through the event pipeline.

/// A fresh session: READY, one guild with an active thread, some traffic
#[must_use]
pub fn fresh_session() -> Vec<&'static str> {
    vec![
        r#"{"op":0,"t":"READY","s":1,"d":{
            "v":10,
            "user":{"id":"1","username":"bot","bot":true},
            "session_id":"abc",
            "resume_gateway_url":"wss://resume.example",
            "guilds":[{"id":"100","unavailable":true}],
            "shard":[0,1]
        }}"#,
        r#"{"op":0,"t":"GUILD_CREATE","s":2,"d":{
            "id":"100",
            "name":"lounge",
            "owner_id":"7",
            "member_count":3,
            "large":false,
            "channels":[
                {"id":"200","type":0,"name":"general","position":0},
                {"id":"201","type":2,"name":"voice","position":1}
            ],
            "threads":[
                {"id":"500","type":11,"parent_id":"200","name":"sidebar",
                 "owner_id":"9",
                 "thread_metadata":{"archived":false,"auto_archive_duration":1440}}
            ],
            "roles":[
                {"id":"100","name":"@everyone","permissions":"7","position":0},
                {"id":"110","name":"mods","permissions":"120","position":1}
            ],
            "members":[
                {"user":{"id":"9","username":"quokka"},"joined_at":"2024-01-01T00:00:00Z","roles":["110"]},
                {"user":{"id":"10","username":"wombat"},"joined_at":"2024-02-01T00:00:00Z"}
            ],
            "voice_states":[
                {"guild_id":"100","channel_id":"201","user_id":"9","session_id":"vs1"}
            ],
            "emojis":[{"id":"300","name":"blob"}]
        }}"#,
        r#"{"op":0,"t":"MESSAGE_CREATE","s":3,"d":{
            "id":"400",
            "channel_id":"200",
            "guild_id":"100",
            "author":{"id":"9","username":"quokka"},
            "content":"first",
            "timestamp":"2024-06-01T12:00:00Z"
        }}"#,
        r#"{"op":0,"t":"MESSAGE_UPDATE","s":4,"d":{
            "id":"400",
            "channel_id":"200",
            "guild_id":"100",
            "author":{"id":"9","username":"quokka"},
            "content":"edited",
            "timestamp":"2024-06-01T12:00:00Z",
            "edited_timestamp":"2024-06-01T12:01:00Z"
        }}"#,
        r#"{"op":0,"t":"GUILD_MEMBER_ADD","s":5,"d":{
            "guild_id":"100",
            "user":{"id":"11","username":"koala"},
            "joined_at":"2024-06-01T13:00:00Z"
        }}"#,
        r#"{"op":0,"t":"THREAD_MEMBERS_UPDATE","s":6,"d":{
            "id":"500",
            "guild_id":"100",
            "member_count":1,
            "added_members":[
                {"id":"500","user_id":"9","join_timestamp":"2024-06-01T13:30:00Z"}
            ]
        }}"#,
        r#"{"op":0,"t":"GUILD_ROLE_UPDATE","s":7,"d":{
            "guild_id":"100",
            "role":{"id":"110","name":"moderators","permissions":"127","position":1}
        }}"#,
        r#"{"op":0,"t":"MESSAGE_CREATE","s":8,"d":{
            "id":"401",
            "channel_id":"200",
            "guild_id":"100",
            "author":{"id":"10","username":"wombat"},
            "content":"second",
            "timestamp":"2024-06-01T14:00:00Z"
        }}"#,
        r#"{"op":0,"t":"MESSAGE_DELETE","s":9,"d":{
            "id":"400",
            "channel_id":"200",
            "guild_id":"100"
        }}"#,
        r#"{"op":0,"t":"VOICE_STATE_UPDATE","s":10,"d":{
            "guild_id":"100",
            "channel_id":null,
            "user_id":"9",
            "session_id":"vs1"
        }}"#,
    ]
}

/// Continuation of [`fresh_session`] replayed after a transient close
#[must_use]
pub fn resumed_tail() -> Vec<&'static str> {
    vec![
        r#"{"op":0,"t":"RESUMED","s":10,"d":null}"#,
        r#"{"op":0,"t":"MESSAGE_CREATE","s":11,"d":{
            "id":"402",
            "channel_id":"200",
            "guild_id":"100",
            "author":{"id":"9","username":"quokka"},
            "content":"after resume",
            "timestamp":"2024-06-01T15:00:00Z"
        }}"#,
    ]
}

/// A guild removal that must cascade through every cache
#[must_use]
pub fn guild_removal() -> Vec<&'static str> {
    vec![r#"{"op":0,"t":"GUILD_DELETE","s":12,"d":{"id":"100","unavailable":false}}"#]
}
