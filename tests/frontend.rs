//! End-to-end builds of representative C snippets.
//!
//! Each case must lower to a module that passes structural verification.

use kolak::{ArchInfo, CBuilder, COptions, IrModule, Verifier};

fn build(src: &str) -> IrModule {
    let builder = CBuilder::new(ArchInfo::example(), COptions::default());
    let module = match builder.build(src) {
        Ok(module) => module,
        Err(err) => {
            let lines: Vec<&str> = src.lines().collect();
            panic!("{}", err.render(&lines));
        }
    };
    if let Err(errors) = Verifier::verify(&module) {
        panic!("verification failed: {:?}", errors);
    }
    module
}

#[test]
fn hello_world() {
    build(
        r#"
        void printf(char*, ...);
        void main(int b) {
          printf("Hello \x81 world %i\n", 42);
        }
        "#,
    );
}

#[test]
fn adjacent_strings_and_static_local() {
    let module = build(
        r#"
        void printf(char*);
        void main(int b) {
          printf("Hello" "world\n");
          static unsigned char msg[]= "Woooot\n";
          printf(msg);
        }
        "#,
    );
    assert!(module.datas.iter().any(|d| d == b"Helloworld\n\0"));
    assert!(module.globals.iter().any(|g| g.name == "main.msg"));
}

#[test]
fn global_assignment() {
    build(
        "
        int a;
        void main(int b) {
         a = 10 + b;
        }
        ",
    );
}

#[test]
fn static_and_plain_globals() {
    build(
        "
        static int c, d, e;
        static float x;
        char f, g;
        int main() {
          int d;
          d = 20 + c * 10 + c >> 2 - 123;
          return d;
        }
        ",
    );
}

#[test]
fn control_structures() {
    build(
        "
        int main() {
          int d,i,c;
          c = 2;
          d = 20 + c * 10 + c >> 2 - 123;
          if (d < 10)
          {
            while (d < 20)
            {
              d = d + c * 4;
            }
          }

          if (d > 20)
          {
            do {
              d += c;
            } while (d < 100);
          }
          else
          {
            for (i=i;i<10;i++) { }
            for (i=0;;) { }
            for (;;) { }
          }
          return d;
        }
        ",
    );
}

#[test]
fn conditionals_as_values() {
    build(
        "
        int main() {
          int d, i, c;
          c = (( (d < 10) || (i != c) ) | 22) != 0;
          return c;
        }
        ",
    );
}

#[test]
fn expression_forms() {
    build(
        "
        void main() {
          int a,b,c,d;
          c = 2;
          d = a + b - c / a * b;
          d = !a;
          d = a ? b : c + 2;
        }
        ",
    );
}

#[test]
fn anonymous_struct_and_decrements() {
    build(
        "
        int main(int, int c) {
          int stack[2];
          struct { int ptr;} *s;
          int d;
          d = 20 + c * 10 + c >> 2 - 123;
          d = stack[--s->ptr];
          --d;
          d--;
          return d;
        }
        ",
    );
}

#[test]
fn call_with_argument() {
    build(
        "
        static int G;
        void initialize(int g)
        {
          G = g;
        }
        int main(int, int c) {
          int d = 2;
          initialize(d);
          return d;
        }
        ",
    );
}

#[test]
fn type_modifier_forms() {
    build(
        "
        void main() {
        int n;
        n = sizeof(int);
        int *a[3];
        n = sizeof(int *[3]);
        int (*p)[3];
        n = sizeof(int (*)[3]);
        n = sizeof(int *(void));
        volatile const int * volatile vc;
        }
        int *f(void);
        ",
    );
}

#[test]
fn struct_usage() {
    build(
        "
        typedef struct {int quot, rem; } div_t;
        struct z { int foo; };
        struct s;
        struct s* p;
        struct s {
         struct s *next;
         int b:2+5, c:9, d;
         struct z Z;
         int *g;
        };
        struct s AllocS;
        void main() {
         volatile div_t x, *y;
         x.rem = 2;
         y = &x;
         y->quot = x.rem = sizeof *AllocS.g;
         struct s S;
         S.next->next->b = 1;
        }
        ",
    );
}

#[test]
fn union_flat_initializers() {
    let module = build(
        "
        union z { int foo; struct { int b, a, r; } bar;};
        union z myZ[2] = {1, 2, 3};
        void main() {
          union z localZ[2] = {1, 2, 3};
        }
        ",
    );
    // Two unions of 12 bytes; the first scalar lands in each first member.
    let z = module.globals.iter().find(|g| g.name == "myZ").unwrap();
    assert_eq!(z.init.len(), 24);
    assert_eq!(&z.init[0..4], &[1, 0, 0, 0]);
    assert_eq!(&z.init[12..16], &[2, 0, 0, 0]);
}

#[test]
fn array_types() {
    build(
        "
        int a[10];
        int b[] = {1, 2};
        int bbb[] = {1, 2,}; // Trailing comma
        void main() {
         int c[sizeof(long int)/sizeof(char)];
         unsigned long long d[] = {1ULL, 2ULL};
         a[2] = b[10] + c[2] + d[1];
         int* p = a + 2;
         int A[][3] = {1,2,3,4,5,6,7,8,9};
        }
        ",
    );
}

#[test]
fn array_index_through_pointer() {
    build(
        "
        void main() {
         int* a, b;
         b = a[100];
        }
        ",
    );
}

#[test]
fn enum_usage() {
    build(
        "
        void main() {
         enum E { A, B, C=A+10 };
         enum E e = A;
         e = B;
         e = 2;
        }
        ",
    );
}

#[test]
fn literal_forms() {
    build(
        r#"
        void main() {
         int i;
         char *s, c;
         i = 10l;
         s = "Hello!" "World!";
         c = ' ';
        }
        "#,
    );
}

#[test]
fn assignment_operators() {
    build(
        "
        void main() {
         int a, b, c;
         a += b - c;
         a -= b - c;
         a /= b - c;
         a %= b - c;
         a |= b - c;
         a &= b - c;
        }
        ",
    );
}

#[test]
fn sizeof_forms() {
    build(
        "
        void main() {
         int x, *y;
         union U;
         union U { int x; };
         union U u;
         x = sizeof(float*);
         x = sizeof *y;
         x = sizeof(*y);
         x = sizeof(union U);
         int w = sizeof w;  // Sizeof works on the expression before the '='
        }
        ",
    );
}

#[test]
fn goto_and_labels() {
    build(
        "
        void main() {
          goto part2;
          part2: goto part2;
          switch(0) {
           case 34: break;
           default: break;
          }
        }
        ",
    );
}

#[test]
fn continue_in_loop() {
    build(
        "
        void main() {
          while (1) {
            continue;
          }
        }
        ",
    );
}

#[test]
fn break_in_loop() {
    build(
        "
        void main() {
          while (1) {
            break;
          }
        }
        ",
    );
}

#[test]
fn switch_statement() {
    build(
        "
        void main() {
          int a;
          short b = 23L;
          switch (b) {
            case 34:
              a -= 5;
              break;
            case 342LL:
              break;
            default:
              a += 2;
              break;
          }
        }
        ",
    );
}

#[test]
fn void_function_recursion() {
    build(
        "
        void main(void) {
          main();
        }
        ",
    );
}

#[test]
fn function_arguments_with_cast() {
    build(
        "
        void add(int a, int b, int c);
        void main() {
          add((int)22, 2, 3);
        }
        ",
    );
}

#[test]
fn forward_declaration_merges() {
    let module = build(
        "
        extern char a;
        char a = 2;
        ",
    );
    assert_eq!(module.globals.len(), 1);
    assert_eq!(module.globals[0].init, vec![2]);
}

#[test]
fn softfloat_shift_routine() {
    build(
        "
        #define INLINE
        typedef short int16;
        typedef unsigned int bits32;
        typedef char int8;

        INLINE void
         shift64ExtraRightJamming(
             bits32 a0,
             bits32 a1,
             bits32 a2,
             int16 count,
             bits32 *z0Ptr,
             bits32 *z1Ptr,
             bits32 *z2Ptr
         )
        {
            bits32 z0, z1, z2;
            int8 negCount = ( - count ) & 31;

            if ( count == 0 ) {
                z2 = a2;
                z1 = a1;
                z0 = a0;
            }
            else {
                if ( count < 32 ) {
                    z2 = a1<<negCount;
                    z1 = ( a0<<negCount ) | ( a1>>count );
                    z0 = a0>>count;
                }
                else {
                    if ( count == 32 ) {
                        z2 = a1;
                        z1 = a0;
                    }
                    else {
                        a2 |= a1;
                        if ( count < 64 ) {
                            z2 = a0<<negCount;
                            z1 = a0>>( count & 31 );
                        }
                        else {
                            z2 = ( count == 64 ) ? a0 : ( a0 != 0 );
                            z1 = 0;
                        }
                    }
                    z0 = 0;
                }
                z2 |= ( a2 != 0 );
            }
            *z2Ptr = z2;
            *z1Ptr = z1;
            *z0Ptr = z0;

        }
        ",
    );
}

#[test]
fn scalar_initialization() {
    build(
        r"
        char x = '\2';
        int* ptr = (int*)0x1000;

        void main() {
          char x = '\2';
          int* ptr = (int*)0x1000;
        }
        ",
    );
}

#[test]
fn function_pointer_passing() {
    build(
        "
        void callback(void)
        {
        }

        static void (*cb)(void);
        void register_callback(void (*f)())
        {
          cb = f;
        }

        void main() {
          register_callback(callback);
        }
        ",
    );
}
