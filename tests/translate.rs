//! Integration tests for wg-quick config translation.

use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;

use vpn_netns::VpnConfig;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create test config");
    file.write_all(content.as_bytes())
        .expect("failed to write test config");
    file
}

#[test]
fn test_translation_strips_exactly_the_host_side_directives() {
    let file = write_config(
        "PrivateKey = aGVsbG8gd29ybGQgdGhpcyBpcyBub3QgYSBrZXk=\n\
         Address = 10.0.0.2/32\n\
         ListenPort = 51820\n\
         DNS = 1.1.1.1\n\
         PersistentKeepalive = 25\n",
    );

    let config = VpnConfig::parse(file.path()).expect("parse failed");

    assert_eq!(config.address.as_deref(), Some("10.0.0.2/32"));
    assert_eq!(config.dns.as_deref(), Some("1.1.1.1"));

    let sanitized = config.sanitized().expect("sanitize failed");
    let written = fs::read_to_string(sanitized.path()).expect("failed to read sanitized file");

    // Exactly the three unrelated directives, original order, nothing else.
    assert_eq!(
        written.lines().collect::<Vec<_>>(),
        [
            "PrivateKey = aGVsbG8gd29ybGQgdGhpcyBpcyBub3QgYSBrZXk=",
            "ListenPort = 51820",
            "PersistentKeepalive = 25",
        ]
    );
}

#[test]
fn test_section_headers_and_comments_pass_through() {
    let file = write_config(
        "# tunnel to the lab\n\
         [Interface]\n\
         Address = 10.0.0.2/32\n\
         PrivateKey = abc=\n\
         \n\
         [Peer]\n\
         PublicKey = def=\n",
    );

    let config = VpnConfig::parse(file.path()).expect("parse failed");
    assert_eq!(
        config.directives,
        [
            "# tunnel to the lab",
            "[Interface]",
            "PrivateKey = abc=",
            "",
            "[Peer]",
            "PublicKey = def=",
        ]
    );
}
