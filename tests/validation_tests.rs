//! Validation behavior tests
//!
//! Each test compiles a small schema and checks the exact diagnostics
//! produced for a handful of instance documents.

use pretty_assertions::assert_eq;

use xsdcheck::XsdSchema;

fn compile(body: &str) -> XsdSchema {
    let xsd = format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">{}</xs:schema>"#,
        body
    );
    XsdSchema::from_string(&xsd).unwrap()
}

fn messages(schema: &XsdSchema, xml: &str) -> Vec<String> {
    schema
        .validate_string(xml)
        .unwrap()
        .into_iter()
        .map(|e| e.message)
        .collect()
}

const XSI: &str = r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#;

// ============================================================================
// Content models
// ============================================================================

#[test]
fn test_sequence_unexpected_child() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:sequence>
                 <xs:element name="a"/>
                 <xs:element name="b"/>
               </xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<r><a/><b/></r>").is_empty());
    assert_eq!(
        messages(&schema, "<r><a/><c/></r>"),
        vec!["Element 'c': This element is not expected. Expected is ( b )."]
    );
    assert_eq!(
        messages(&schema, "<r><a/></r>"),
        vec!["Element 'r': Missing child element(s). Expected is ( b )."]
    );
}

#[test]
fn test_choice_lists_alternatives() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:choice>
                 <xs:element name="a"/>
                 <xs:element name="b"/>
               </xs:choice>
             </xs:complexType>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<r><b/></r>").is_empty());
    assert_eq!(
        messages(&schema, "<r><c/></r>"),
        vec!["Element 'c': This element is not expected. Expected is ( a, b )."]
    );
}

#[test]
fn test_all_group_any_order() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:all>
                 <xs:element name="a"/>
                 <xs:element name="b"/>
               </xs:all>
             </xs:complexType>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<r><b/><a/></r>").is_empty());
    assert_eq!(
        messages(&schema, "<r><a/><a/></r>"),
        vec!["Element 'a': This element is not expected. Expected is ( b )."]
    );
}

#[test]
fn test_nested_optional_groups() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:sequence>
                 <xs:sequence minOccurs="0" maxOccurs="unbounded">
                   <xs:element name="a" minOccurs="0"/>
                   <xs:choice minOccurs="0" maxOccurs="unbounded">
                     <xs:element name="b"/>
                     <xs:element name="c" minOccurs="0"/>
                   </xs:choice>
                 </xs:sequence>
                 <xs:element name="end"/>
               </xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    let body = "<a/><b/><c/>".repeat(40);
    assert!(messages(&schema, &format!("<r>{body}<end/></r>")).is_empty());
    assert_eq!(messages(&schema, &format!("<r>{body}</r>")).len(), 1);
}

#[test]
fn test_siblings_after_failure_still_validated() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:sequence>
                 <xs:element name="a" type="xs:int"/>
                 <xs:element name="b" type="xs:int"/>
               </xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    assert_eq!(
        messages(&schema, "<r><a>x</a><c/><b>y</b></r>"),
        vec![
            "Element 'a': 'x' is not a valid value of the atomic type 'xs:int'.",
            "Element 'c': This element is not expected. Expected is ( b ).",
            "Element 'b': 'y' is not a valid value of the atomic type 'xs:int'.",
        ]
    );
}

#[test]
fn test_subtrees_after_failure_still_validated() {
    let schema = compile(
        r#"<xs:element name="order">
             <xs:complexType>
               <xs:sequence>
                 <xs:element name="item" maxOccurs="unbounded">
                   <xs:complexType>
                     <xs:sequence>
                       <xs:element name="qty">
                         <xs:simpleType>
                           <xs:restriction base="xs:integer">
                             <xs:maxInclusive value="10"/>
                           </xs:restriction>
                         </xs:simpleType>
                       </xs:element>
                     </xs:sequence>
                   </xs:complexType>
                 </xs:element>
                 <xs:element name="note" type="xs:string" minOccurs="0"/>
               </xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    let errors = schema
        .validate_string(
            "<order><item><qty>15</qty></item><bogus/><item><qty>99</qty></item></order>",
        )
        .unwrap();
    let found: Vec<(&str, String)> = errors
        .iter()
        .map(|e| (e.message.as_str(), e.path_string()))
        .collect();
    assert_eq!(
        found,
        vec![
            (
                "Element 'qty': [facet 'maxInclusive'] The value '15' is greater than the maximum value allowed ('10').",
                "/order[1]/item[1]/qty[1]".to_string()
            ),
            (
                "Element 'bogus': This element is not expected. Expected is ( item, note ).",
                "/order[1]/bogus[1]".to_string()
            ),
            (
                "Element 'qty': [facet 'maxInclusive'] The value '99' is greater than the maximum value allowed ('10').",
                "/order[1]/item[2]/qty[1]".to_string()
            ),
        ]
    );
}

#[test]
fn test_too_many_child_is_still_validated() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:sequence>
                 <xs:element name="v" type="xs:int" maxOccurs="2"/>
               </xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    assert_eq!(
        messages(&schema, "<r><v>1</v><v>2</v><v>x</v></r>"),
        vec![
            "Element 'v': This element is not expected. Maximum number of occurrences (2) exceeded.",
            "Element 'v': 'x' is not a valid value of the atomic type 'xs:int'.",
        ]
    );
}

// ============================================================================
// Content types
// ============================================================================

#[test]
fn test_empty_content() {
    let schema = compile(
        r#"<xs:element name="e">
             <xs:complexType/>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<e/>").is_empty());
    assert_eq!(
        messages(&schema, "<e>text</e>"),
        vec!["Element 'e': Character content is not allowed, because the content type is empty."]
    );
    assert_eq!(
        messages(&schema, "<e><x/></e>"),
        vec!["Element 'e': Element content is not allowed, because the content type is empty."]
    );
}

#[test]
fn test_element_only_rejects_text() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:sequence><xs:element name="a"/></xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<r>\n  <a/>\n</r>").is_empty());
    assert_eq!(
        messages(&schema, "<r>hello<a/></r>"),
        vec!["Element 'r': Character content other than whitespace is not allowed because the content type is 'element-only'."]
    );
}

#[test]
fn test_mixed_content_allows_text() {
    let schema = compile(
        r#"<xs:element name="p">
             <xs:complexType mixed="true">
               <xs:sequence><xs:element name="b" minOccurs="0" maxOccurs="unbounded"/></xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<p>Some <b>bold</b> text</p>").is_empty());
}

#[test]
fn test_simple_type_rejects_children_and_attributes() {
    let schema = compile(r#"<xs:element name="n" type="xs:string"/>"#);
    assert_eq!(
        messages(&schema, "<n><x/></n>"),
        vec!["Element 'n': Element content is not allowed, because the type definition is simple."]
    );
    assert_eq!(
        messages(&schema, r#"<n a="1">v</n>"#),
        vec!["Element 'n', attribute 'a': The attribute 'a' is not allowed."]
    );
}

#[test]
fn test_simple_content_extension_attributes() {
    let schema = compile(
        r#"<xs:element name="price">
             <xs:complexType>
               <xs:simpleContent>
                 <xs:extension base="xs:decimal">
                   <xs:attribute name="currency" type="xs:string" use="required"/>
                 </xs:extension>
               </xs:simpleContent>
             </xs:complexType>
           </xs:element>"#,
    );
    assert!(messages(&schema, r#"<price currency="EUR">9.99</price>"#).is_empty());
    assert_eq!(
        messages(&schema, r#"<price currency="EUR">cheap</price>"#),
        vec!["Element 'price': 'cheap' is not a valid value of the atomic type 'xs:decimal'."]
    );
    assert_eq!(
        messages(&schema, "<price>1</price>"),
        vec!["Element 'price': The attribute 'currency' is required but missing."]
    );
}

// ============================================================================
// Simple types
// ============================================================================

#[test]
fn test_enumeration_and_pattern() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:sequence>
                 <xs:element name="color">
                   <xs:simpleType>
                     <xs:restriction base="xs:string">
                       <xs:enumeration value="red"/>
                       <xs:enumeration value="green"/>
                     </xs:restriction>
                   </xs:simpleType>
                 </xs:element>
                 <xs:element name="code">
                   <xs:simpleType>
                     <xs:restriction base="xs:string">
                       <xs:pattern value="[A-Z]{3}"/>
                     </xs:restriction>
                   </xs:simpleType>
                 </xs:element>
               </xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<r><color>red</color><code>ABC</code></r>").is_empty());

    let found = messages(&schema, "<r><color>blue</color><code>ABCD</code></r>");
    assert_eq!(found.len(), 2);
    assert_eq!(
        found[0],
        "Element 'color': [facet 'enumeration'] The value 'blue' is not an element of the set {'red', 'green'}."
    );
    assert!(found[1].starts_with("Element 'code': [facet 'pattern'] The value 'ABCD'"));
}

#[test]
fn test_named_list_type() {
    let schema = compile(
        r#"<xs:simpleType name="intList">
             <xs:list itemType="xs:int"/>
           </xs:simpleType>
           <xs:element name="v" type="intList"/>"#,
    );
    assert!(messages(&schema, "<v> 1  2 3 </v>").is_empty());
    assert_eq!(
        messages(&schema, "<v>1 2 x</v>"),
        vec!["Element 'v': '1 2 x' is not a valid value of the list type 'intList'."]
    );
}

#[test]
fn test_union_type() {
    let schema = compile(
        r#"<xs:element name="v">
             <xs:simpleType>
               <xs:union memberTypes="xs:int xs:boolean"/>
             </xs:simpleType>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<v>12</v>").is_empty());
    assert!(messages(&schema, "<v>true</v>").is_empty());
    let found = messages(&schema, "<v>maybe</v>");
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("union"));
}

#[test]
fn test_date_bound_with_timezone() {
    let schema = compile(
        r#"<xs:element name="d">
             <xs:simpleType>
               <xs:restriction base="xs:date">
                 <xs:maxExclusive value="2024-01-01"/>
               </xs:restriction>
             </xs:simpleType>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<d>2023-12-01</d>").is_empty());
    assert!(messages(&schema, "<d>2023-12-01+05:00</d>").is_empty());
    assert_eq!(
        messages(&schema, "<d>2024-01-01+05:00</d>"),
        vec!["Element 'd': [facet 'maxExclusive'] The value '2024-01-01+05:00' must be less than '2024-01-01'."]
    );
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn test_attribute_checks() {
    let schema = compile(
        r#"<xs:element name="item">
             <xs:complexType>
               <xs:attribute name="id" type="xs:int" use="required"/>
               <xs:attribute name="kind" type="xs:string" fixed="book"/>
             </xs:complexType>
           </xs:element>"#,
    );
    assert!(messages(&schema, r#"<item id="1" kind="book"/>"#).is_empty());
    assert_eq!(
        messages(&schema, r#"<item id="one" kind="cd" extra="x"/>"#),
        vec![
            "Element 'item', attribute 'id': 'one' is not a valid value of the atomic type 'xs:int'.",
            "Element 'item', attribute 'kind': The value 'cd' does not match the fixed value constraint 'book'.",
            "Element 'item', attribute 'extra': The attribute 'extra' is not allowed.",
        ]
    );
}

#[test]
fn test_attribute_group_and_wildcard() {
    let schema = compile(
        r#"<xs:attributeGroup name="common">
             <xs:attribute name="lang" type="xs:language"/>
           </xs:attributeGroup>
           <xs:element name="t">
             <xs:complexType>
               <xs:attributeGroup ref="common"/>
               <xs:anyAttribute processContents="skip"/>
             </xs:complexType>
           </xs:element>"#,
    );
    assert!(messages(&schema, r#"<t lang="en" whatever="1"/>"#).is_empty());
    assert_eq!(messages(&schema, r#"<t lang="not a language"/>"#).len(), 1);
}

#[test]
fn test_attribute_path() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:sequence>
                 <xs:element name="i" maxOccurs="unbounded">
                   <xs:complexType>
                     <xs:attribute name="n" type="xs:int"/>
                   </xs:complexType>
                 </xs:element>
               </xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    let errors = schema
        .validate_string("<r>\n<i n=\"1\"/>\n<i n=\"x\"/>\n</r>")
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path_string(), "/r[1]/i[2]/@n");
    assert_eq!(errors[0].line, 3);
}

// ============================================================================
// Wildcards
// ============================================================================

#[test]
fn test_lax_wildcard_validates_known_elements() {
    let schema = compile(
        r#"<xs:element name="known" type="xs:int"/>
           <xs:element name="r">
             <xs:complexType>
               <xs:sequence>
                 <xs:any processContents="lax" maxOccurs="unbounded"/>
               </xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    assert_eq!(
        messages(&schema, "<r><unknown><deep/></unknown><known>x</known></r>"),
        vec!["Element 'known': 'x' is not a valid value of the atomic type 'xs:int'."]
    );
}

#[test]
fn test_strict_wildcard_requires_declaration() {
    let schema = compile(
        r#"<xs:element name="known" type="xs:int"/>
           <xs:element name="r">
             <xs:complexType>
               <xs:sequence>
                 <xs:any processContents="strict"/>
               </xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<r><known>1</known></r>").is_empty());
    assert_eq!(
        messages(&schema, "<r><unknown/></r>"),
        vec!["Element 'unknown': No matching global element declaration available, but demanded by the strict wildcard."]
    );
}

#[test]
fn test_skip_wildcard_other_namespace() {
    let schema = XsdSchema::from_string(
        r###"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                      targetNamespace="urn:a" elementFormDefault="qualified">
             <xs:element name="r">
               <xs:complexType>
                 <xs:sequence>
                   <xs:any namespace="##other" processContents="skip"/>
                 </xs:sequence>
               </xs:complexType>
             </xs:element>
           </xs:schema>"###,
    )
    .unwrap();
    assert!(messages(&schema, r#"<r xmlns="urn:a"><x xmlns="urn:b" y="1"/></r>"#).is_empty());
    assert_eq!(
        messages(&schema, r#"<r xmlns="urn:a"><x/></r>"#).len(),
        1
    );
}

// ============================================================================
// Derivation, substitution and xsi attributes
// ============================================================================

const SHAPES: &str = r#"
  <xs:complexType name="Shape">
    <xs:sequence><xs:element name="name" type="xs:string"/></xs:sequence>
  </xs:complexType>
  <xs:complexType name="Circle">
    <xs:complexContent>
      <xs:extension base="Shape">
        <xs:sequence><xs:element name="radius" type="xs:decimal"/></xs:sequence>
      </xs:extension>
    </xs:complexContent>
  </xs:complexType>
  <xs:complexType name="Unrelated">
    <xs:sequence><xs:element name="name" type="xs:string"/></xs:sequence>
  </xs:complexType>
  <xs:complexType name="AbstractShape" abstract="true">
    <xs:sequence><xs:element name="name" type="xs:string"/></xs:sequence>
  </xs:complexType>
  <xs:element name="shape" type="Shape"/>
  <xs:element name="anyShape" type="AbstractShape"/>
  <xs:element name="figure" type="Shape" abstract="true"/>
  <xs:element name="circle" type="Circle" substitutionGroup="figure"/>
  <xs:element name="drawing">
    <xs:complexType>
      <xs:sequence><xs:element ref="figure" maxOccurs="unbounded"/></xs:sequence>
    </xs:complexType>
  </xs:element>
"#;

#[test]
fn test_extension_content() {
    let schema = compile(SHAPES);
    assert!(messages(
        &schema,
        &format!(r#"<shape {XSI} xsi:type="Circle"><name>c</name><radius>2.5</radius></shape>"#)
    )
    .is_empty());
    assert_eq!(
        messages(&schema, "<shape><name>c</name><radius>2.5</radius></shape>"),
        vec!["Element 'radius': This element is not expected."]
    );
}

#[test]
fn test_xsi_type_must_derive() {
    let schema = compile(SHAPES);
    let found = messages(
        &schema,
        &format!(r#"<shape {XSI} xsi:type="Unrelated"><name>c</name></shape>"#),
    );
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("is blocked or not validly derived"));

    let found = messages(&schema, &format!(r#"<shape {XSI} xsi:type="Missing"><name>c</name></shape>"#));
    assert_eq!(found.len(), 1);
    assert!(found[0].contains("does not resolve to a type definition"));
}

#[test]
fn test_abstract_type_needs_xsi_type() {
    let schema = compile(SHAPES);
    assert_eq!(
        messages(&schema, "<anyShape><name>x</name></anyShape>"),
        vec!["Element 'anyShape': The type definition is abstract."]
    );
}

#[test]
fn test_substitution_group() {
    let schema = compile(SHAPES);
    assert!(messages(
        &schema,
        "<drawing><circle><name>c</name><radius>1</radius></circle></drawing>"
    )
    .is_empty());

    let found = messages(&schema, "<drawing><figure><name>f</name></figure></drawing>");
    assert_eq!(found.len(), 1);
    assert!(found[0].starts_with("Element 'figure': This element is not expected."));
}

#[test]
fn test_xsi_nil() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:sequence>
                 <xs:element name="opt" type="xs:int" nillable="true"/>
                 <xs:element name="req" type="xs:string"/>
               </xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    assert!(messages(
        &schema,
        &format!(r#"<r {XSI}><opt xsi:nil="true"/><req>x</req></r>"#)
    )
    .is_empty());
    assert_eq!(
        messages(&schema, &format!(r#"<r {XSI}><opt xsi:nil="true">5</opt><req>x</req></r>"#)),
        vec!["Element 'opt': The element cannot be 'nilled' because it is not empty."]
    );
    assert_eq!(
        messages(&schema, &format!(r#"<r {XSI}><opt>1</opt><req xsi:nil="true"/></r>"#)),
        vec!["Element 'req': The element is not 'nillable'."]
    );
}

// ============================================================================
// Values
// ============================================================================

#[test]
fn test_element_fixed_and_default() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:sequence>
                 <xs:element name="version" type="xs:decimal" fixed="1.0"/>
                 <xs:element name="count" type="xs:int" default="0"/>
               </xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<r><version>1.00</version><count/></r>").is_empty());
    assert!(messages(&schema, "<r><version/><count>3</count></r>").is_empty());
    assert_eq!(
        messages(&schema, "<r><version>2</version><count/></r>"),
        vec!["Element 'version': The value '2' does not match the fixed value constraint '1.0'."]
    );
}

#[test]
fn test_id_and_idref() {
    let schema = compile(
        r#"<xs:element name="doc">
             <xs:complexType>
               <xs:sequence>
                 <xs:element name="ref" minOccurs="0" maxOccurs="unbounded">
                   <xs:complexType>
                     <xs:attribute name="to" type="xs:IDREF"/>
                   </xs:complexType>
                 </xs:element>
                 <xs:element name="entry" maxOccurs="unbounded">
                   <xs:complexType>
                     <xs:attribute name="id" type="xs:ID"/>
                   </xs:complexType>
                 </xs:element>
               </xs:sequence>
             </xs:complexType>
           </xs:element>"#,
    );
    // Forward references resolve
    assert!(messages(&schema, r#"<doc><ref to="b"/><entry id="a"/><entry id="b"/></doc>"#).is_empty());

    let errors = schema
        .validate_string(r#"<doc><ref to="zz"/><entry id="a"/><entry id="a"/></doc>"#)
        .unwrap();
    let found: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        found,
        vec![
            "Element 'entry', attribute 'id': Duplicate ID value 'a'.",
            "Element 'ref', attribute 'to': IDREF 'zz' does not match any ID in the document.",
        ]
    );
    assert_eq!(errors[0].path_string(), "/doc[1]/entry[2]/@id");
    assert_eq!(errors[1].path_string(), "/doc[1]/ref[1]/@to");
}

// ============================================================================
// Identity constraints
// ============================================================================

const USER_DB: &str = r#"<xs:element name="db">
     <xs:complexType>
       <xs:sequence>
         <xs:element name="user" maxOccurs="unbounded">
           <xs:complexType><xs:attribute name="id" type="xs:string"/></xs:complexType>
         </xs:element>
         <xs:element name="post" minOccurs="0" maxOccurs="unbounded">
           <xs:complexType><xs:attribute name="author" type="xs:string"/></xs:complexType>
         </xs:element>
       </xs:sequence>
     </xs:complexType>
     <xs:key name="userKey">
       <xs:selector xpath="user"/>
       <xs:field xpath="@id"/>
     </xs:key>
     <xs:keyref name="authorRef" refer="userKey">
       <xs:selector xpath="post"/>
       <xs:field xpath="@author"/>
     </xs:keyref>
   </xs:element>"#;

#[test]
fn test_key_and_keyref() {
    let schema = compile(USER_DB);
    assert!(messages(&schema, r#"<db><user id="a"/><user id="b"/><post author="b"/></db>"#).is_empty());

    let errors = schema
        .validate_string(r#"<db><user id="a"/><user id="a"/><post author="zz"/></db>"#)
        .unwrap();
    let found: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        found,
        vec![
            "Element 'user': Duplicate key-sequence ['a'] in key identity-constraint 'userKey'.",
            "Element 'post': No match found for key-sequence ['zz'] of keyref 'authorRef'.",
        ]
    );
    assert_eq!(errors[0].path_string(), "/db[1]/user[2]");
    assert_eq!(errors[1].path_string(), "/db[1]/post[1]");
}

#[test]
fn test_key_field_must_be_present() {
    let schema = compile(USER_DB);
    assert_eq!(
        messages(&schema, r#"<db><user id="a"/><user/><post/></db>"#),
        vec!["Element 'user': Not all fields of key identity-constraint 'userKey' evaluate to a node-set with exactly one member."]
    );
}

#[test]
fn test_unique_with_descendant_selector() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:sequence>
                 <xs:any processContents="skip" maxOccurs="unbounded"/>
               </xs:sequence>
             </xs:complexType>
             <xs:unique name="codes">
               <xs:selector xpath=".//item"/>
               <xs:field xpath="code"/>
             </xs:unique>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<r><item><code>A1</code></item><item/><item/></r>").is_empty());

    let errors = schema
        .validate_string("<r><g><item><code> A1 </code></item></g><item><code>A1</code></item></r>")
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "Element 'item': Duplicate key-sequence ['A1'] in unique identity-constraint 'codes'."
    );
    assert_eq!(errors[0].path_string(), "/r[1]/item[1]");
}

#[test]
fn test_unique_on_element_text() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:sequence><xs:element name="k" type="xs:string" maxOccurs="unbounded"/></xs:sequence>
             </xs:complexType>
             <xs:unique name="ks">
               <xs:selector xpath="k"/>
               <xs:field xpath="."/>
             </xs:unique>
           </xs:element>"#,
    );
    assert!(messages(&schema, "<r><k>a</k><k>b</k></r>").is_empty());
    assert_eq!(
        messages(&schema, "<r><k>a</k><k>a</k></r>"),
        vec!["Element 'k': Duplicate key-sequence ['a'] in unique identity-constraint 'ks'."]
    );
}

#[test]
fn test_keyref_sees_keys_of_descendants() {
    let schema = compile(
        r#"<xs:element name="r">
             <xs:complexType>
               <xs:sequence>
                 <xs:element name="list">
                   <xs:complexType>
                     <xs:sequence>
                       <xs:element name="entry" maxOccurs="unbounded">
                         <xs:complexType><xs:attribute name="name"/></xs:complexType>
                       </xs:element>
                     </xs:sequence>
                   </xs:complexType>
                   <xs:key name="entryKey">
                     <xs:selector xpath="entry"/>
                     <xs:field xpath="@name"/>
                   </xs:key>
                 </xs:element>
                 <xs:element name="ref" maxOccurs="unbounded">
                   <xs:complexType><xs:attribute name="to"/></xs:complexType>
                 </xs:element>
               </xs:sequence>
             </xs:complexType>
             <xs:keyref name="entryRef" refer="entryKey">
               <xs:selector xpath="ref"/>
               <xs:field xpath="@to"/>
             </xs:keyref>
           </xs:element>"#,
    );
    assert_eq!(
        messages(&schema, r#"<r><list><entry name="a"/></list><ref to="a"/><ref to="b"/></r>"#),
        vec!["Element 'ref': No match found for key-sequence ['b'] of keyref 'entryRef'."]
    );
}

#[test]
fn test_identity_errors_follow_content_errors() {
    let schema = compile(USER_DB);
    assert_eq!(
        messages(&schema, r#"<db><user id="a"/><user id="a"><x/></user></db>"#),
        vec![
            "Element 'user': Element content is not allowed, because the content type is empty.",
            "Element 'user': Duplicate key-sequence ['a'] in key identity-constraint 'userKey'.",
        ]
    );
}

// ============================================================================
// Namespaces
// ============================================================================

#[test]
fn test_unqualified_local_elements() {
    let schema = XsdSchema::from_string(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                      xmlns:t="urn:t" targetNamespace="urn:t">
             <xs:element name="root">
               <xs:complexType>
                 <xs:sequence><xs:element name="child" type="xs:string"/></xs:sequence>
               </xs:complexType>
             </xs:element>
           </xs:schema>"#,
    )
    .unwrap();
    assert!(messages(&schema, r#"<t:root xmlns:t="urn:t"><child/></t:root>"#).is_empty());
    assert_eq!(
        messages(&schema, r#"<root xmlns="urn:t"><child/></root>"#),
        vec!["Element '{urn:t}child': This element is not expected. Expected is ( child )."]
    );
}
