// Test module organization
