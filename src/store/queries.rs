pub const INSERT_EMERGENCY: &str = r#"
INSERT INTO emergencies (id, requester_id, kost_id, message, status, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, NOW(), NOW());
"#;

pub const UPDATE_EMERGENCY_STATUS: &str = r#"
UPDATE emergencies
SET status = $2,
    updated_at = NOW()
WHERE id = $1;
"#;

pub const SELECT_EMERGENCY: &str = r#"
SELECT id, requester_id, kost_id, message, status, created_at, updated_at
FROM emergencies WHERE id = $1;
"#;

pub const SELECT_EMERGENCY_STATUS: &str = r#"
SELECT status FROM emergencies WHERE id = $1;
"#;

pub const SELECT_ACTIVE_FOR_REQUESTER: &str = r#"
SELECT id, requester_id, kost_id, message, status, created_at, updated_at
FROM emergencies
WHERE requester_id = $1 AND status = 'active'
ORDER BY created_at DESC
LIMIT 1;
"#;
